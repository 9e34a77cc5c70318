pub mod account;
pub mod category;
pub mod client;
pub mod config;
pub mod conversions;
pub mod ens;
pub mod error;
pub mod hub;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod registry;
pub mod wallet;

use alloy::sol;

pub use client::ContractClient;
pub use config::ChainConfig;
pub use error::ContractError;
pub use hub::{Hub, MatchReceipt};
pub use registry::{App, Dataset, Deployed, ResourceKind, Workerpool};

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IexecHub {
        struct AppOrder {
            address app;
            uint256 appprice;
            uint256 volume;
            bytes32 tag;
            address datasetrestrict;
            address workerpoolrestrict;
            address requesterrestrict;
            bytes32 salt;
            bytes sign;
        }

        struct DatasetOrder {
            address dataset;
            uint256 datasetprice;
            uint256 volume;
            bytes32 tag;
            address apprestrict;
            address workerpoolrestrict;
            address requesterrestrict;
            bytes32 salt;
            bytes sign;
        }

        struct WorkerpoolOrder {
            address workerpool;
            uint256 workerpoolprice;
            uint256 volume;
            bytes32 tag;
            uint256 category;
            uint256 trust;
            address apprestrict;
            address datasetrestrict;
            address requesterrestrict;
            bytes32 salt;
            bytes sign;
        }

        struct RequestOrder {
            address app;
            uint256 appmaxprice;
            address dataset;
            uint256 datasetmaxprice;
            address workerpool;
            uint256 workerpoolmaxprice;
            address requester;
            uint256 volume;
            bytes32 tag;
            uint256 category;
            uint256 trust;
            address beneficiary;
            address callback;
            string params;
            bytes32 salt;
            bytes sign;
        }

        struct AppOrderOperation {
            AppOrder order;
            uint8 operation;
            bytes sign;
        }

        struct DatasetOrderOperation {
            DatasetOrder order;
            uint8 operation;
            bytes sign;
        }

        struct WorkerpoolOrderOperation {
            WorkerpoolOrder order;
            uint8 operation;
            bytes sign;
        }

        struct RequestOrderOperation {
            RequestOrder order;
            uint8 operation;
            bytes sign;
        }

        struct Resource {
            address pointer;
            address owner;
            uint256 price;
        }

        struct Deal {
            Resource app;
            Resource dataset;
            Resource workerpool;
            uint256 trust;
            uint256 category;
            bytes32 tag;
            address requester;
            address beneficiary;
            address callback;
            string params;
            uint256 startTime;
            uint256 botFirst;
            uint256 botSize;
            uint256 workerStake;
            uint256 schedulerRewardRatio;
        }

        struct Task {
            uint8 status;
            bytes32 dealid;
            uint256 idx;
            uint256 timeref;
            uint256 contributionDeadline;
            uint256 revealDeadline;
            uint256 finalDeadline;
            bytes32 consensusValue;
            uint256 revealCounter;
            uint256 winnerCounter;
            address[] contributors;
            bytes32 resultDigest;
            bytes results;
            uint256 resultsTimestamp;
            bytes resultsCallback;
        }

        struct Category {
            string name;
            string description;
            uint256 workClockTimeRef;
        }

        struct Account {
            uint256 stake;
            uint256 locked;
        }

        function matchOrders(
            AppOrder calldata appOrder,
            DatasetOrder calldata datasetOrder,
            WorkerpoolOrder calldata workerpoolOrder,
            RequestOrder calldata requestOrder
        ) external returns (bytes32);

        function manageAppOrder(AppOrderOperation calldata operation) external;
        function manageDatasetOrder(DatasetOrderOperation calldata operation) external;
        function manageWorkerpoolOrder(WorkerpoolOrderOperation calldata operation) external;
        function manageRequestOrder(RequestOrderOperation calldata operation) external;

        function viewDeal(bytes32 id) external view returns (Deal memory);
        function viewTask(bytes32 id) external view returns (Task memory);
        function viewConsumed(bytes32 id) external view returns (uint256);

        function viewCategory(uint256 id) external view returns (Category memory);
        function countCategory() external view returns (uint256);
        function createCategory(string calldata name, string calldata description, uint256 workClockTimeRef) external returns (uint256);
        function owner() external view returns (address);
        function token() external view returns (address);
        function final_deadline_ratio() external view returns (uint256);

        function appregistry() external view returns (address);
        function datasetregistry() external view returns (address);
        function workerpoolregistry() external view returns (address);

        function viewAccount(address account) external view returns (Account memory);
        function withdraw(uint256 amount) external returns (bool);
        function claim(bytes32 taskid) external;

        event OrdersMatched(bytes32 dealid, bytes32 appHash, bytes32 datasetHash, bytes32 workerpoolHash, bytes32 requestHash, uint256 volume);
        event ClosedAppOrder(bytes32 appHash);
        event ClosedDatasetOrder(bytes32 datasetHash);
        event ClosedWorkerpoolOrder(bytes32 workerpoolHash);
        event ClosedRequestOrder(bytes32 requestHash);
        event CreateCategory(uint256 catid, string name, string description, uint256 workClockTimeRef);
        event TaskClaimed(bytes32 indexed taskid);
    }
}

sol! {
    /// Escrow entry point of hubs whose RLC is the chain's native currency.
    #[sol(rpc)]
    interface IexecEscrowNative {
        function deposit() external payable returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function approveAndCall(address spender, uint256 value, bytes calldata extraData) external returns (bool);
    }
}

/// `OrderOperationEnum.CLOSE` in the hub's order management entry points.
pub const ORDER_OPERATION_CLOSE: u8 = 1;
