//! Contract bindings for the DexTrader, Uniswap V3 quoter and ERC-20 tokens

use alloy::sol;

sol! {
    interface IDexTrader {
        #[derive(Debug, PartialEq, Eq)]
        event Trade(
            address indexed token0,
            address indexed token1,
            uint24 fee,
            uint256 amountIn,
            uint256 amountOut
        );

        function trade(
            address token0,
            address token1,
            uint24 poolFee,
            uint256 amountIn,
            uint256 amountOutMinimum
        ) external returns (uint256 amountOut);
    }
}

sol! {
    interface IQuoter {
        function quoteExactInputSingle(
            address tokenIn,
            address tokenOut,
            uint24 fee,
            uint256 amountIn,
            uint160 sqrtPriceLimitX96
        ) external returns (uint256 amountOut);

        function quoteExactOutputSingle(
            address tokenIn,
            address tokenOut,
            uint24 fee,
            uint256 amountOut,
            uint160 sqrtPriceLimitX96
        ) external returns (uint256 amountIn);
    }
}

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}
