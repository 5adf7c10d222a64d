//! Offer Desk Example
//!
//! Handlers are registered in a [`HandlerCatalog`] by name and bound to
//! selectors in `reacton.toml`:
//!
//! ```text
//! ^=offer        -> audit     (priority 100, records every offer event)
//! offer.accept   -> floor     (priority 10, counters lowball offers and stops)
//! offer.accept   -> accept
//! offer.decline  -> decline
//! ~=withdrawn    -> withdraw
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package offer-desk -- trigger offer.accept --customer John --dollars 24
//! cargo run --package offer-desk -- trigger offer.accept --customer John --dollars 5 --floor 10
//! cargo run --package offer-desk -- trigger offer.accept offer.withdrawn --customer John --dollars 24
//! cargo run --package offer-desk -- resolve offer.accept
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;
use reacton::prelude::*;
use serde_json::{Value, json};
use tracing::info;

/// Lowest acceptable offer unless `--floor` is given.
const DEFAULT_FLOOR: u32 = 10;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "reacton.toml")]
    config: PathBuf,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Trigger one or more events for a customer.
    Trigger(TriggerArgs),
    /// Show the handlers an event would run, in order.
    Resolve {
        /// Event name.
        event: String,
    },
}

#[derive(Args, Debug)]
struct TriggerArgs {
    /// Event names, dispatched in order.
    #[arg(required = true)]
    events: Vec<String>,

    /// Customer making the offer.
    #[arg(long)]
    customer: String,

    /// Offer amount.
    #[arg(long, default_value_t = 0)]
    dollars: u32,

    /// Lowest acceptable offer.
    #[arg(long)]
    floor: Option<u32>,

    /// Stop at the first response containing this text (single event only).
    #[arg(long)]
    until: Option<String>,
}

// ============================================================================
// Target
// ============================================================================

struct Customer {
    name: String,
    ledger: Mutex<Vec<String>>,
}

fn customer(ctx: &EventContext) -> Result<&Customer, HandlerError> {
    ctx.target::<Customer>()
        .ok_or_else(|| HandlerError::msg("event target is not a customer"))
}

// ============================================================================
// Handlers
// ============================================================================

fn audit(ctx: &mut EventContext) -> Result<String, HandlerError> {
    let entry = format!("{} (${})", ctx.name(), ctx.param_as::<u32>("dollars")?);
    customer(ctx)?.ledger.lock().push(entry.clone());
    Ok(format!("logged {entry}"))
}

fn floor(ctx: &mut EventContext) -> Result<Option<String>, HandlerError> {
    let dollars: u32 = ctx.param_as("dollars")?;
    let floor: u32 = ctx.param_as("floor")?;
    if dollars >= floor {
        return Ok(None);
    }

    let name = customer(ctx)?.name.clone();
    ctx.stop_propagation();
    Ok(Some(format!(
        "{name}, ${dollars} is below our floor; we can do ${floor}"
    )))
}

fn accept(ctx: &mut EventContext) -> Result<String, HandlerError> {
    let dollars: u32 = ctx.param_as("dollars")?;
    Ok(format!(
        "{}, I have accepted your offer of ${dollars}",
        customer(ctx)?.name
    ))
}

fn decline(ctx: &mut EventContext) -> Result<String, HandlerError> {
    let dollars: u32 = ctx.param_as("dollars")?;
    Ok(format!(
        "{}, I must decline your offer of ${dollars}",
        customer(ctx)?.name
    ))
}

fn withdraw(ctx: &mut EventContext) -> Result<String, HandlerError> {
    Ok(format!("{} withdrew the offer", customer(ctx)?.name))
}

fn catalog() -> HandlerCatalog {
    HandlerCatalog::new()
        .with("audit", audit)
        .with("floor", floor)
        .with("accept", accept)
        .with("decline", decline)
        .with("withdraw", withdraw)
}

// ============================================================================
// Commands
// ============================================================================

fn print_responses(responses: &ResponseCollection) {
    for (position, response) in responses.iter().enumerate() {
        match response {
            Value::Null => println!("  #{position}: -"),
            Value::String(text) => println!("  #{position}: {text}"),
            other => println!("  #{position}: {other}"),
        }
    }
}

fn trigger(runtime: &ReactonRuntime, args: TriggerArgs) -> Result<()> {
    let target = Arc::new(Customer {
        name: args.customer,
        ledger: Mutex::new(Vec::new()),
    });

    let mut arguments = Arguments::new();
    arguments.insert("dollars".into(), json!(args.dollars));
    arguments.insert("floor".into(), json!(args.floor.unwrap_or(DEFAULT_FLOOR)));

    let dispatcher = runtime.dispatcher();
    let result = match (&args.until, args.events.as_slice()) {
        (Some(needle), [event]) => dispatcher.trigger_until(
            event,
            target.clone(),
            arguments,
            |response| response.as_str().is_some_and(|text| text.contains(needle.as_str())),
        ),
        (Some(_), _) => bail!("--until can only be used with a single event"),
        (None, events) => dispatcher.trigger_many(events, target.clone(), arguments),
    };

    let responses = match result {
        Ok(responses) => responses,
        Err(err) => {
            if let ReactonError::Handler(failure) = &err {
                println!("Responses before the failure:");
                print_responses(&failure.partial);
            }
            return Err(err.into());
        }
    };

    info!(
        events = ?args.events,
        responses = responses.len(),
        stopped = responses.stopped(),
        "Dispatch finished"
    );

    println!("Responses:");
    print_responses(&responses);
    if responses.stopped() {
        println!("(stopped early)");
    }

    println!("Ledger for {}:", target.name);
    for entry in target.ledger.lock().iter() {
        println!("  {entry}");
    }

    Ok(())
}

fn resolve(runtime: &ReactonRuntime, event: &str) -> Result<()> {
    let handlers = runtime.dispatcher().resolve(event)?;
    if handlers.is_empty() {
        println!("No handlers for '{event}'");
        return Ok(());
    }

    for (position, entry) in handlers.iter().enumerate() {
        println!(
            "  #{position}: {:<10} {:<16} priority {}",
            entry.handler().name(),
            entry.selector().to_string(),
            entry.priority()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = ReactonRuntime::builder()
        .config_file(cli.config.clone())
        .catalog(catalog());
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile.clone());
    }
    let runtime = builder.build()?;

    for skipped in &runtime.report().skipped {
        eprintln!(
            "warning: binding #{} ('{}' -> '{}') skipped: {}",
            skipped.index, skipped.selector, skipped.handler, skipped.reason
        );
    }

    match cli.command {
        Command::Trigger(args) => trigger(&runtime, args),
        Command::Resolve { event } => resolve(&runtime, &event),
    }
}
