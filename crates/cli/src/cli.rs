use std::path::PathBuf;
use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};
use clap::{Args, Parser, Subcommand};
use iexec_core::{DealId, OrderHash, OrderKind, TaskId, TaskStatus, TeeFramework};

#[derive(Parser)]
#[command(name = "iexec")]
#[command(about = "iExec marketplace command line", long_about = None)]
pub struct Cli {
    /// Chain preset (local, bellecour) or path to a chain.toml
    #[arg(long, global = true, env = "IEXEC_CHAIN")]
    pub chain: Option<String>,

    /// Hex private key used to sign orders and transactions
    #[arg(long, global = true, env = "IEXEC_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub raw: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build, sign and manage marketplace orders
    #[command(subcommand)]
    Order(OrderCommand),

    /// Match an app, workerpool and request order (and optionally a dataset order)
    Match(MatchArgs),

    /// Inspect deals
    #[command(subcommand)]
    Deal(DealCommand),

    /// Inspect and follow tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Computation categories
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Balances and transfers
    #[command(subcommand)]
    Wallet(WalletCommand),

    /// RLC staked on the hub
    #[command(subcommand)]
    Account(AccountCommand),

    /// Deploy and inspect apps
    #[command(subcommand)]
    App(AppCommand),

    /// Dataset deployment, encryption and secrets
    #[command(subcommand)]
    Dataset(DatasetCommand),

    /// Deploy and inspect workerpools
    #[command(subcommand)]
    Workerpool(WorkerpoolCommand),

    /// Result encryption key management
    #[command(subcommand)]
    Result(ResultCommand),
}

#[derive(Subcommand)]
pub enum OrderCommand {
    /// Build an unsigned order from fields
    Init {
        kind: OrderKind,
        /// JSON object with the order fields
        #[arg(long, default_value = "{}")]
        fields: String,
        /// Single field as key=value, may be repeated
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Sign an unsigned order read from a JSON file
    Sign {
        kind: OrderKind,
        #[arg(long)]
        order: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Publish a signed order on the marketplace
    Publish {
        kind: OrderKind,
        #[arg(long)]
        order: PathBuf,
    },

    /// Remove a published order from the marketplace
    Unpublish { kind: OrderKind, order_hash: OrderHash },

    /// Invalidate a signed order on-chain
    Cancel {
        kind: OrderKind,
        #[arg(long)]
        order: PathBuf,
    },

    /// Show a published order, or list the orderbook when no hash is given
    Show {
        kind: OrderKind,
        order_hash: Option<OrderHash>,
        /// List orders of this app, dataset, workerpool or requester
        #[arg(long, conflicts_with = "category")]
        resource: Option<Address>,
        /// List workerpool or request orders of this category
        #[arg(long)]
        category: Option<u64>,
    },
}

#[derive(Args)]
pub struct MatchArgs {
    #[arg(long)]
    pub app: PathBuf,
    #[arg(long)]
    pub dataset: Option<PathBuf>,
    #[arg(long)]
    pub workerpool: PathBuf,
    #[arg(long)]
    pub request: PathBuf,
}

#[derive(Subcommand)]
pub enum DealCommand {
    Show {
        deal_id: DealId,
    },

    /// Deals of a requester, as indexed by the marketplace
    List {
        /// Defaults to the signer's address
        #[arg(long)]
        requester: Option<Address>,
        #[arg(long)]
        app: Option<Address>,
        #[arg(long)]
        dataset: Option<Address>,
        #[arg(long)]
        workerpool: Option<Address>,
        /// Only deals created before this ISO 8601 date
        #[arg(long)]
        before: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    Show {
        task_id: TaskId,
    },

    /// Wait until the task leaves its current (or the given) status
    Wait {
        task_id: TaskId,
        #[arg(long)]
        from: Option<TaskStatus>,
        /// Seconds before giving up
        #[arg(long, default_value_t = 600)]
        timeout: u64,
        /// Seconds between polls
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },

    /// Show where a completed task stored its results
    Results {
        task_id: TaskId,
        /// Download the result archive from the IPFS gateway to this file
        #[arg(long)]
        download: Option<PathBuf>,
    },

    /// Off-chain task information from the workerpool API
    Debug { task_id: TaskId },

    /// Stdout of one worker's replicate
    Stdout { task_id: TaskId, worker: Address },

    /// Fail a task that missed its final deadline and get refunded
    Claim { task_id: TaskId },
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    Show {
        index: u64,
    },
    Count,
    /// Final deadline of a task, in units of its category's work clock
    TimeoutRatio,
    /// Create a category (hub owner only)
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        work_clock_time_ref: u64,
    },
}

#[derive(Subcommand)]
pub enum WalletCommand {
    /// Native and RLC balances
    Show { address: Option<Address> },
    /// Send native currency, amount in wei
    SendEth {
        amount: U256,
        #[arg(long)]
        to: Address,
    },
    /// Send RLC, amount in nRLC
    SendRlc {
        amount: U256,
        #[arg(long)]
        to: Address,
    },
    /// Send everything to another wallet
    Sweep {
        #[arg(long)]
        to: Address,
    },
}

#[derive(Subcommand)]
pub enum AccountCommand {
    /// Stake and locked amounts, in nRLC
    Show { address: Option<Address> },
    /// Move nRLC from the wallet to the account
    Deposit { amount: U256 },
    /// Move free stake back to the wallet, amount in nRLC
    Withdraw { amount: U256 },
}

/// A deployed resource, by address or by index among a user's resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceRef {
    Address(Address),
    Index(u64),
}

impl FromStr for ResourceRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(address) = s.parse::<Address>() {
            return Ok(Self::Address(address));
        }
        s.parse::<u64>()
            .map(Self::Index)
            .map_err(|_| format!("{s} is neither an address nor an index"))
    }
}

#[derive(Args)]
pub struct ShowArgs {
    /// Address, or index among the user's resources
    pub target: ResourceRef,
    /// Owner used with an index; defaults to the signer's address
    #[arg(long)]
    pub user: Option<Address>,
}

#[derive(Subcommand)]
pub enum AppCommand {
    Deploy {
        #[arg(long)]
        name: String,
        /// Docker image, e.g. registry.hub.docker.com/iexechub/vanityeth:1.1.1
        #[arg(long)]
        multiaddr: String,
        /// sha256 digest of the image
        #[arg(long)]
        checksum: B256,
        #[arg(long = "type", default_value = "DOCKER")]
        app_type: String,
        /// JSON enclave description for TEE apps
        #[arg(long, default_value = "")]
        mrenclave: String,
        /// Defaults to the signer's address
        #[arg(long)]
        owner: Option<Address>,
    },
    Show(ShowArgs),
    Count {
        #[arg(long)]
        user: Option<Address>,
    },
}

#[derive(Subcommand)]
pub enum WorkerpoolCommand {
    Deploy {
        #[arg(long)]
        description: String,
        #[arg(long)]
        owner: Option<Address>,
    },
    Show(ShowArgs),
    Count {
        #[arg(long)]
        user: Option<Address>,
    },
}

#[derive(Subcommand)]
pub enum DatasetCommand {
    Deploy {
        #[arg(long)]
        name: String,
        /// Where the encrypted dataset can be downloaded from
        #[arg(long)]
        multiaddr: String,
        #[arg(long, default_value_t = B256::ZERO)]
        checksum: B256,
        #[arg(long)]
        owner: Option<Address>,
    },
    Show(ShowArgs),
    Count {
        #[arg(long)]
        user: Option<Address>,
    },
    /// Print a new base64 AES-256 key
    GenerateKey,
    /// Encrypt a file as IV followed by AES-256-CBC ciphertext
    Encrypt {
        file: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Decrypt {
        file: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Push a dataset's decryption key to the SMS
    PushSecret {
        dataset: Address,
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "scone")]
        tee_framework: TeeFramework,
    },
}

#[derive(Subcommand)]
pub enum ResultCommand {
    CheckKey {
        /// Defaults to the signer's address
        address: Option<Address>,
        #[arg(long, default_value = "scone")]
        tee_framework: TeeFramework,
    },
    PushKey {
        /// PEM encoded RSA public key
        public_key: PathBuf,
        #[arg(long)]
        force: bool,
        #[arg(long, default_value = "scone")]
        tee_framework: TeeFramework,
    },
}
