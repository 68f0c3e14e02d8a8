//! Contract interfaces the planner encodes against and the readers decode
//! from. Pure `sol!` type bindings; all I/O goes through `rpc::ChainClient`.

use alloy::sol;

sol! {
    /// Standard ERC-20 subset: approvals and balance reads.
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

sol! {
    /// Aave v3 pool entry points used by the plan builder.
    interface IAavePool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function borrow(address asset, uint256 amount, uint256 interestRateMode, uint16 referralCode, address onBehalfOf) external;
    }

    /// Aave v3 protocol data provider, read side.
    interface IPoolDataProvider {
        function getUserReserveData(address asset, address user) external view returns (
            uint256 currentATokenBalance,
            uint256 currentStableDebt,
            uint256 currentVariableDebt,
            uint256 principalStableDebt,
            uint256 scaledVariableDebt,
            uint256 stableBorrowRate,
            uint256 liquidityRate,
            uint40 stableRateLastUpdated,
            bool usageAsCollateralEnabled
        );
        function getReserveConfigurationData(address asset) external view returns (
            uint256 decimals,
            uint256 ltv,
            uint256 liquidationThreshold,
            uint256 liquidationBonus,
            uint256 reserveFactor,
            bool usageAsCollateralEnabled,
            bool borrowingEnabled,
            bool stableBorrowRateEnabled,
            bool isActive,
            bool isFrozen
        );
    }

    /// Aave v3 rewards controller, read side.
    interface IRewardsController {
        function getAllUserRewards(address[] calldata assets, address user) external view returns (
            address[] memory rewardsList,
            uint256[] memory unclaimedAmounts
        );
    }
}

sol! {
    /// Lido: submit mints stETH 1:1 for ETH.
    interface ILido {
        function submit(address _referral) external payable returns (uint256);
    }

    /// wstETH wrapper over stETH.
    interface IWstEth {
        function wrap(uint256 _stETHAmount) external returns (uint256);
        function unwrap(uint256 _wstETHAmount) external returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}

sol! {
    /// EtherFi: deposit mints eETH 1:1 for ETH.
    interface IEtherFiLiquidityPool {
        function deposit(address _referral) external payable returns (uint256);
    }

    /// weETH wrapper over eETH.
    interface IWeEth {
        function wrap(uint256 _eETHAmount) external returns (uint256);
        function unwrap(uint256 _weETHAmount) external returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}

sol! {
    /// Compound v3 comet, read side. Rates are per-second, 1e18-scaled.
    interface IComet {
        function balanceOf(address account) external view returns (uint256);
        function borrowBalanceOf(address account) external view returns (uint256);
        function getUtilization() external view returns (uint256);
        function getSupplyRate(uint256 utilization) external view returns (uint64);
    }
}

sol! {
    /// ERC-4626 vault subset (Morpho vaults).
    interface IErc4626 {
        function balanceOf(address account) external view returns (uint256);
        function convertToAssets(uint256 shares) external view returns (uint256);
        function asset() external view returns (address);
    }
}

sol! {
    /// EigenLayer strategy manager, read side.
    interface IStrategyManager {
        function stakerStrategyShares(address staker, address strategy) external view returns (uint256);
    }
}

sol! {
    /// Uniswap v3 SwapRouter02 (no deadline parameter).
    interface ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }
}

sol! {
    /// Multicall3, deployed at the same address on every supported chain.
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Value {
            address target;
            bool allowFailure;
            uint256 value;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
        function aggregate3Value(Call3Value[] calldata calls) external payable returns (Result[] memory returnData);
    }
}
