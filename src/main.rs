use std::io::{self, Write};

use anyhow::Result;
use log::info;

mod blockchain;

use blockchain::{Address, Blockchain, ChainConfig, LedgerService, Transaction, Wallet};

/// Interactive console front end for the ledger: wallet management, sending
/// transactions, balance queries and chain inspection. Thin I/O only; all
/// rules live in the blockchain module.
struct Console {
    mainnet: LedgerService,
    testnet: LedgerService,
    on_mainnet: bool,
    wallet: Option<Wallet>,
    mainnet_initialized: bool,
    testnet_initialized: bool,
}

impl Console {
    fn new() -> Self {
        Console {
            mainnet: LedgerService::new(Blockchain::new(ChainConfig::mainnet())),
            testnet: LedgerService::new(Blockchain::new(ChainConfig::testnet())),
            on_mainnet: true,
            wallet: None,
            mainnet_initialized: false,
            testnet_initialized: false,
        }
    }

    fn service(&self) -> &LedgerService {
        if self.on_mainnet {
            &self.mainnet
        } else {
            &self.testnet
        }
    }

    /// Mines a bootstrap reward block for the active wallet the first time
    /// it touches a chain, so it has funds to send
    fn initialize_chain(&mut self) -> Result<()> {
        let wallet = match &self.wallet {
            Some(wallet) => wallet.clone(),
            None => return Ok(()),
        };

        let initialized = if self.on_mainnet {
            self.mainnet_initialized
        } else {
            self.testnet_initialized
        };

        if initialized {
            return Ok(());
        }

        info!("Initializing {} for {}", self.service().chain_name(), wallet.address());
        self.service().initialize_for(wallet.address())?;

        if self.on_mainnet {
            self.mainnet_initialized = true;
        } else {
            self.testnet_initialized = true;
        }

        Ok(())
    }

    fn create_wallet(&mut self) -> Result<()> {
        if self.wallet.is_some() {
            println!("You are already logged in with a wallet. Please log out first.");
            return Ok(());
        }

        let wallet = Wallet::new()?;
        println!("New wallet created with address: {}", wallet.address());
        println!("Private key: {}", wallet.export_secret_hex());
        self.wallet = Some(wallet);

        Ok(())
    }

    fn restore_wallet(&mut self) -> Result<()> {
        if self.wallet.is_some() {
            println!("Current wallet is still active. Please log out first.");
            return Ok(());
        }

        let private_key = prompt("Enter the private key to restore the wallet: ")?;
        if private_key.is_empty() {
            println!("Private key cannot be empty.");
            return Ok(());
        }

        match Wallet::from_secret_hex(&private_key) {
            Ok(wallet) => {
                println!("Wallet restored with address: {}", wallet.address());
                self.wallet = Some(wallet);
            }
            Err(err) => println!("Error restoring wallet: {}", err),
        }

        Ok(())
    }

    fn log_out(&mut self) -> Result<()> {
        if self.wallet.is_none() {
            println!("No wallet created. Please create a wallet first.");
            return Ok(());
        }

        let confirmation = prompt("Are you sure you want to log out from the current wallet? (y/n) ")?;
        if confirmation.eq_ignore_ascii_case("y") {
            self.wallet = None;
            println!("Logged out from the current wallet.");
        } else {
            println!("Log out cancelled.");
        }

        Ok(())
    }

    fn send_transaction(&mut self) -> Result<()> {
        let wallet = match &self.wallet {
            Some(wallet) => wallet.clone(),
            None => {
                println!("No wallet created. Please create a wallet first.");
                return Ok(());
            }
        };

        let recipient = prompt("Enter the recipient's address: ")?;
        if recipient.is_empty() {
            println!("Recipient address cannot be empty.");
            return Ok(());
        }

        let amount: f64 = match prompt("Enter the amount to send: ")?.parse() {
            Ok(amount) if amount > 0.0 => amount,
            _ => {
                println!("Invalid amount. Please enter a number greater than zero.");
                return Ok(());
            }
        };

        let transaction =
            Transaction::new(wallet.address().clone(), Address::new(recipient), amount);

        match self
            .service()
            .submit_transaction(transaction, &wallet.export_secret_hex())
        {
            // Dropping the handle leaves the mining run detached
            Ok(_handle) => println!("Transaction added; mining started in the background."),
            Err(err) => println!("Error adding transaction: {}", err),
        }

        Ok(())
    }

    fn check_balance(&self) -> Result<()> {
        match &self.wallet {
            Some(wallet) => {
                let balance = self.service().balance_of(&wallet.address().0)?;
                println!("Balance for wallet: {}", balance);
            }
            None => println!("No wallet created. Please create a wallet first."),
        }

        Ok(())
    }

    fn view_chain(&self) -> Result<()> {
        let chain = self.service().get_chain();
        println!("{}", serde_json::to_string_pretty(&chain)?);

        Ok(())
    }

    fn select_chain(&mut self) -> Result<()> {
        println!("Select a blockchain to work with:");
        println!("1. {}", self.mainnet.chain_name());
        println!("2. {}", self.testnet.chain_name());

        match prompt("> ")?.as_str() {
            "1" => {
                self.on_mainnet = true;
                println!("Switched to {}.", self.mainnet.chain_name());
            }
            "2" => {
                self.on_mainnet = false;
                println!("Switched to {}.", self.testnet.chain_name());
            }
            _ => println!("Invalid selection. Please try again."),
        }

        Ok(())
    }

    fn validate_chain(&self) {
        match self.service().validate_chain() {
            Ok(()) => println!("Blockchain is valid."),
            Err(err) => println!("Blockchain is invalid: {}", err),
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_string())
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    println!("Creating chains (mining genesis blocks)...");
    let mut console = Console::new();

    loop {
        console.initialize_chain()?;

        println!();
        println!("Blockchain Demo");
        println!("Current blockchain: {}", console.service().chain_name());
        println!(
            "Current wallet: {}",
            console
                .wallet
                .as_ref()
                .map(|w| w.address().to_string())
                .unwrap_or_else(|| "No wallet created".to_string())
        );
        println!("1. Create a new wallet");
        println!("2. Restore a wallet from a private key");
        println!("3. Log out from the current wallet");
        println!("4. Send a transaction");
        println!("5. See balance");
        println!("6. View blockchain");
        println!("7. Select a different blockchain");
        println!("8. Validate the current blockchain");
        println!("q. Quit");

        match prompt("> ")?.as_str() {
            "1" => console.create_wallet()?,
            "2" => console.restore_wallet()?,
            "3" => console.log_out()?,
            "4" => console.send_transaction()?,
            "5" => console.check_balance()?,
            "6" => console.view_chain()?,
            "7" => console.select_chain()?,
            "8" => console.validate_chain(),
            "q" | "Q" => {
                println!("Exiting.");
                break;
            }
            _ => println!("Invalid option. Please try again."),
        }
    }

    Ok(())
}
