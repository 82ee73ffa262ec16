//! Solidity bindings for the collection contract.

use std::fmt;

use alloy_sol_types::sol;

use crate::error::Error;

sol! {
    interface IAllowListCollection {
        function publicMint(uint256 quantity) external payable;
        function whitelistMint(uint256 quantity, bytes32[] calldata merkleProof) external payable;
        function freeMint(uint256 quantity, bytes32[] calldata merkleProof) external;
        function saleState() external view returns (uint8);
        function publicPrice() external view returns (uint256);
        function whitelistPrice() external view returns (uint256);
        function remainingSupply() external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function MAX_SUPPLY() external view returns (uint256);
        function freeMintRemaining() external view returns (uint256);
        function getWalletMintStats(address account) external view returns (
            uint256 whitelistMinted,
            uint256 publicMinted,
            uint256 freeMinted,
            uint256 freeMintAllowance,
            bool holdsPartnerToken
        );
        function walletOfOwner(address owner) external view returns (uint256[] memory);
    }
}

/// Contract-side `saleState()` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleState {
    Closed,
    Whitelist,
    Public,
}

impl TryFrom<u8> for SaleState {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SaleState::Closed),
            1 => Ok(SaleState::Whitelist),
            2 => Ok(SaleState::Public),
            other => Err(Error::UnknownSaleState(other)),
        }
    }
}

impl fmt::Display for SaleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaleState::Closed => "CLOSED",
            SaleState::Whitelist => "WHITELIST",
            SaleState::Public => "PUBLIC",
        })
    }
}
