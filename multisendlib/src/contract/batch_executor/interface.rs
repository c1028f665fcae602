use alloy::sol;

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IBatchExecutor {
        /// Emitted once per completed batch; the multi token entry point
        /// emits one event per token instead.
        event BatchTransfer(
            address indexed sender,
            address indexed token,
            uint256 totalAmount,
            uint256 recipientCount
        );

        error LengthMismatch();
        error EmptyInput();
        error ValueMismatch(uint256 expected, uint256 actual);
        error InvalidRecipient();
        error InvalidToken();
        error ZeroAmount();
        error InsufficientAllowance(address token, uint256 required, uint256 available);
        error NativeTransferFailed(address recipient);
        error TokenTransferFailed(address token, address recipient);
        error DirectTransferNotAccepted();

        function batchTransferNative(
            address[] calldata recipients,
            uint256[] calldata amounts
        ) external payable;

        function batchTransferToken(
            address token,
            address[] calldata recipients,
            uint256[] calldata amounts
        ) external;

        function batchTransferMultiToken(
            address[] calldata tokens,
            address recipient,
            uint256[] calldata amounts
        ) external;
    }
);
