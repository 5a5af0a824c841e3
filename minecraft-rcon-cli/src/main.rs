use ansi_term::Colour::{Fixed, Green, Yellow};
use clap::Parser;
use log::{error, info, LevelFilter};
use minecraft_rcon_client::{
    connect, validate_command, RconClient, RconConfig, RconError, DEFAULT_PORT,
};
use rpassword::read_password;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Address of the Minecraft server, e.g. `127.0.0.1:25575`. The port
    /// defaults to 25575 when omitted.
    address: String,

    /// RCON password. Falls back to the RCON_PASSWORD environment variable,
    /// then to an interactive prompt.
    #[clap(short, long)]
    password: Option<String>,

    /// Per-operation timeout in seconds.
    #[clap(long, default_value_t = 10)]
    timeout: u64,

    /// Disable automatic reconnection.
    #[clap(long)]
    no_reconnect: bool,

    /// Run a single command, print the response and exit.
    #[clap(short, long)]
    command: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap();

    let args = Args::parse();
    let (host, port) = split_address(&args.address);

    let given_password = args
        .password
        .clone()
        .or_else(|| std::env::var("RCON_PASSWORD").ok());
    let interactive_password = given_password.is_none();

    let client = loop {
        let password = match &given_password {
            Some(password) => password.clone(),
            None => {
                print!("{}:{}'s password: ", host, port);
                std::io::stdout().flush().unwrap();
                read_password().unwrap()
            }
        };

        let config = RconConfig::new(host.clone(), port, password)
            .timeout(Duration::from_secs(args.timeout))
            .auto_reconnect(!args.no_reconnect);

        match connect(config).await {
            Ok(client) => break client,
            Err(RconError::Authentication(_)) if interactive_password => {
                println!("Invalid password.");
            }
            Err(RconError::Authentication(msg)) => {
                error!("Authentication failed: {}", msg);
                std::process::exit(1);
            }
            Err(err) => {
                error!("Connection failed: {}", err);
                std::process::exit(1);
            }
        }
    };

    if let Some(command) = &args.command {
        let code = run_single(&client, command).await;
        std::process::exit(code);
    }

    info!(
        "Connected. View builtins with `!help`. {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let prompt = Prompt {
        address: format!("{}:{}", host, port),
    };
    repl_loop(client, prompt).await;
}

/// Split `host[:port]`, defaulting the port when absent.
fn split_address(address: &str) -> (String, u16) {
    match address.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => {
                eprintln!("Invalid address: {}", address);
                std::process::exit(1);
            }
        },
        None => (address.to_string(), DEFAULT_PORT),
    }
}

async fn run_single(client: &RconClient, command: &str) -> i32 {
    if let Err(err) = validate_command(command) {
        eprintln!("Rejected: {}", err);
        return 2;
    }
    match client.execute(command).await {
        Ok(response) => {
            if !response.is_empty() {
                println!("{}", response);
            }
            client.disconnect().await;
            0
        }
        Err(err) => {
            error!("An error occurred: {}", err);
            1
        }
    }
}

struct Prompt {
    address: String,
}

impl Display for Prompt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}> ", Fixed(10).paint(self.address.as_str()))
    }
}

async fn repl_loop(client: RconClient, prompt: Prompt) {
    let mut input_lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", prompt);
        std::io::stdout().flush().unwrap();

        let line = match input_lines.next_line().await.unwrap() {
            Some(line) => line,
            None => {
                client.disconnect().await;
                return;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(builtin) = line.strip_prefix('!') {
            run_builtin(&client, builtin).await;
            continue;
        }

        if let Err(err) = validate_command(line) {
            eprintln!("Rejected: {}", err);
            continue;
        }

        match client.execute(line).await {
            Ok(response) => {
                if !response.is_empty() {
                    println!("{}", response);
                }
            }
            Err(err) => eprintln!("An error occurred: {}", err),
        }
    }
}

async fn run_builtin(client: &RconClient, builtin: &str) {
    match builtin {
        "help" => {
            println!(
                "{} {}",
                Green.paint(env!("CARGO_PKG_NAME")),
                env!("CARGO_PKG_VERSION")
            );
            println!();
            println!("{}", Yellow.paint("BUILTINS"));
            println!("    !help                View this help listing");
            println!("    !list                Show online players");
            println!("    !quit                Close the console");
            println!(
                "    {}  Run a command on the server",
                Green.paint("<COMMAND> [ARGS...]")
            );
        }
        "list" => match client.list_players().await {
            Ok(list) => {
                println!("{}/{} players online", list.online, list.max_players);
                if !list.names.is_empty() {
                    println!("{}", list.names.join(", "));
                }
            }
            Err(err) => eprintln!("An error occurred: {}", err),
        },
        "quit" => {
            client.disconnect().await;
            std::process::exit(0);
        }
        _ => eprintln!("Unknown builtin."),
    }
}
