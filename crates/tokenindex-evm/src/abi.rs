//! Event ABI of the token contract.

use alloy_sol_types::sol;

sol! {
    /// ERC-20 approval.
    #[derive(Debug, PartialEq, Eq)]
    event Approval(address indexed owner, address indexed spender, uint256 value);

    /// ERC-20 transfer.
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(address indexed from, address indexed to, uint256 value);

    /// `Ownable` owner change.
    #[derive(Debug, PartialEq, Eq)]
    event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);

    /// Emitted by the contract's greeting setter.
    #[derive(Debug, PartialEq, Eq)]
    event GreetingChange(address indexed greetingSetter, string newGreeting, bool premium, uint256 value);
}
