//! Interactive travel assistant over the handoff-routing graph.
//!
//! Reads lines from stdin, feeds them into a durable conversation thread,
//! and prints whichever agent's message the machine suspended on. The
//! thread survives restarts: pass `--thread <id>` to continue one, or omit
//! it for a fresh thread.
//!
//! Requires `OPENAI_API_KEY` in the environment (or a `.env` file).

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use tracing_subscriber::EnvFilter;

use travel_graph::engine::OpenAiEngine;
use travel_graph::runner::{ThreadRunner, TurnOutput};
use travel_graph::sqlite_store::SqliteCheckpointStore;
use travel_graph::travel;
use travel_graph::{GraphError, Result, ThreadId};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    if std::env::var("OPENAI_API_KEY").is_err() {
        return Err(GraphError::configuration(
            "OPENAI_API_KEY is not set; export it or add it to a .env file",
        ));
    }

    let model = std::env::var("TRAVEL_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
    let db_path = std::env::var("TRAVEL_DB").unwrap_or_else(|_| "travel_threads.db".to_string());
    let thread_id = parse_thread_arg().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let client = Arc::new(Client::<OpenAIConfig>::new());
    let graph = travel::travel_graph(
        Arc::new(OpenAiEngine::new(
            client.clone(),
            &model,
            travel::supervisor_instructions(),
        )),
        Arc::new(OpenAiEngine::new(
            client.clone(),
            &model,
            travel::flights_advisor_instructions(),
        )),
        Arc::new(OpenAiEngine::new(
            client,
            &model,
            travel::hotel_advisor_instructions(),
        )),
    )?;

    let store = Arc::new(SqliteCheckpointStore::new(&db_path).await?);
    let runner = ThreadRunner::new(graph, store);
    let thread = ThreadId::new(thread_id.clone());

    println!("travel assistant (thread {thread_id}) — type 'exit' to quit");

    // A continued thread may already be suspended; replay its prompt first.
    match runner.start_or_continue(&thread, None).await {
        Ok(TurnOutput::Suspended { prompt, agent }) => {
            println!("[{}] {}", agent, prompt.content);
        }
        Ok(TurnOutput::Final { .. }) => {}
        Err(GraphError::User { .. }) => {} // fresh thread, nothing to replay
        Err(e) => return Err(e),
    }

    let stdin = io::stdin();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        match runner.start_or_continue(&thread, Some(input)).await {
            Ok(TurnOutput::Suspended { prompt, agent }) => {
                println!("[{}] {}", agent, prompt.content);
            }
            Ok(TurnOutput::Final { message }) => {
                if let Some(message) = message {
                    println!("{}", message.content);
                }
                println!("conversation ended");
                break;
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    println!("bye — continue later with: travel-repl --thread {thread_id}");
    Ok(())
}

fn parse_thread_arg() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--thread" {
            return args.next();
        }
    }
    None
}
