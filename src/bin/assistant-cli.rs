use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "assistant-cli")]
#[command(about = "Terminal client for the clinic assistant gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the gateway is up
    Health,
    /// Send a single question to the assistant
    Chat {
        message: String,
        /// Override the server's default model
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Walk through a patient registration interactively.
    /// Type `:doc <file>` to submit a file of model extraction output.
    Register,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/api/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Chat { message, model } => {
            let mut body = json!({ "messages": [{ "role": "user", "content": message }] });
            if let Some(model) = model {
                body["model"] = Value::String(model);
            }
            let res = client.post(format!("{}/api/chat", base)).json(&body).send().await?;
            let status = res.status();
            let value: Value = res.json().await?;
            if status.is_success() {
                println!("{}", value["reply"].as_str().unwrap_or_default());
            } else {
                eprintln!("Error ({}): {}", status, serde_json::to_string_pretty(&value)?);
            }
        }
        Commands::Register => register(&client, base).await?,
    }

    Ok(())
}

async fn register(client: &reqwest::Client, base: &str) -> Result<(), Box<dyn std::error::Error>> {
    let created: Value = client
        .post(format!("{}/api/registration", base))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let session_id = created["session_id"]
        .as_str()
        .ok_or("server did not return a session id")?
        .to_string();
    println!("{}", created["message"].as_str().unwrap_or_default());

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (endpoint, text) = match line.strip_prefix(":doc ") {
            Some(path) => ("document", std::fs::read_to_string(PathBuf::from(path.trim()))?),
            None => ("messages", line.to_string()),
        };

        let res = client
            .post(format!("{}/api/registration/{}/{}", base, session_id, endpoint))
            .json(&json!({ "text": text }))
            .send()
            .await?;
        let status = res.status();
        let reply: Value = res.json().await?;

        if !status.is_success() {
            eprintln!("Error ({}): {}", status, reply["error"].as_str().unwrap_or("unknown"));
            if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::CONFLICT {
                break;
            }
            continue;
        }

        println!("{}", reply["message"].as_str().unwrap_or_default());
        if reply["submitted"].as_bool().unwrap_or(false) {
            println!("{}", serde_json::to_string_pretty(&reply["record"])?);
            break;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
