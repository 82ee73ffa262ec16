use std::fs;

use allowlist_common::{hash_leaf, verify_proof, Address, AllowList};
use proptest::prelude::*;
use serde_json::Value;
use whitelist_cli::{merge_into_minting_config, read_address_file, write_file_atomic, WhitelistFile};

const INPUT: &str = "\
# partners
0xABCDEF0123456789ABCDEF0123456789ABCDEF01
0x1111111111111111111111111111111111111111

0xabcdef0123456789abcdef0123456789abcdef01
0x2222222222222222222222222222222222222222
0x3333333333333333333333333333333333333333
";

#[test]
fn file_to_whitelist_to_verified_proofs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("addresses.txt");
    let output = dir.path().join("whitelist.json");
    fs::write(&input, INPUT).unwrap();

    let addresses = read_address_file(&input).unwrap();
    assert_eq!(addresses.len(), 5);

    let list = AllowList::build(addresses).unwrap();
    assert_eq!(list.len(), 4);

    let file = WhitelistFile::from_allow_list(&list);
    write_file_atomic(&output, &serde_json::to_string_pretty(&file).unwrap()).unwrap();

    let loaded = WhitelistFile::load(&output).unwrap();
    let root = loaded.root().unwrap();
    assert_eq!(root, list.root());
    assert_eq!(loaded.whitelist.len(), 4);

    for member in list.members() {
        let proof = loaded.proof_for(member).unwrap().unwrap();
        assert!(verify_proof(hash_leaf(member), &proof, root));
    }

    let outsider = Address::new([0x44; 20]);
    assert!(loaded.proof_for(&outsider).unwrap().is_none());
}

#[test]
fn empty_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.txt");
    fs::write(&input, "# nothing here\n\n").unwrap();

    assert!(read_address_file(&input).is_err());
}

#[test]
fn minting_config_entries_match_whitelist_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("mintingConfig.json");
    let list = AllowList::build(parse(INPUT)).unwrap();

    merge_into_minting_config(&config, "whitelist", &list, None).unwrap();
    let merged: Value = serde_json::from_str(&fs::read_to_string(&config).unwrap()).unwrap();
    let whitelist = WhitelistFile::from_allow_list(&list);

    for entry in merged["lists"]["whitelist"].as_array().unwrap() {
        let address = entry["address"].as_str().unwrap();
        let proof: Vec<String> = serde_json::from_value(entry["merkleProof"].clone()).unwrap();
        assert_eq!(whitelist.whitelist[address], proof);
    }
}

fn parse(text: &str) -> Vec<Address> {
    whitelist_cli::parse_address_list(text).unwrap()
}

proptest! {
    #[test]
    fn written_files_reload_identically(raw in prop::collection::vec(any::<[u8; 20]>(), 1..40)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.json");
        let list = AllowList::build(raw.into_iter().map(Address::new)).unwrap();
        let file = WhitelistFile::from_allow_list(&list);

        write_file_atomic(&path, &serde_json::to_string(&file).unwrap()).unwrap();
        let loaded = WhitelistFile::load(&path).unwrap();

        prop_assert_eq!(&loaded, &file);
        prop_assert_eq!(loaded.root().unwrap(), list.root());
    }
}
