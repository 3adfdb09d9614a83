//! Scripted session against an in-memory canvas.
//!
//! Plays the part of the presentation layer: it draws, commits, reacts to
//! engine events and prints the messages a user would see.

use std::sync::Arc;

use pixgrid_engine::{
    Account, CellPos, CommitErrorKind, CommitOutcome, CommitReport, DEFAULT_PALETTE, Engine, EngineConfig, EngineError, EngineEvent, MemoryStore,
    TokenUnits, quote_plans,
};
use tokio::sync::broadcast::error::RecvError;

pub struct DemoOptions {
    pub width: u32,
    pub height: u32,
    pub credits: u64,
    pub pixels: u32,
}

#[derive(Debug, Default)]
struct EventTally {
    cells: usize,
    refreshes: usize,
    commits: usize,
    last_version: u64,
}

impl EventTally {
    fn record(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::CellChanged(_) => self.cells += 1,
            EngineEvent::GridRefreshed { version } => {
                self.refreshes += 1;
                self.last_version = *version;
            }
            EngineEvent::CommitFinished { .. } => self.commits += 1,
            _ => {}
        }
    }
}

pub async fn run(config: EngineConfig, options: DemoOptions) -> anyhow::Result<()> {
    let units = TokenUnits::default();
    let store = Arc::new(MemoryStore::new(options.width, options.height));
    let engine = Engine::new(store.clone(), config)?;

    let mut events = engine.subscribe();
    let listener = tokio::spawn(async move {
        let mut tally = EventTally::default();
        loop {
            match events.recv().await {
                Ok(event) => tally.record(&event),
                Err(RecvError::Lagged(skipped)) => log::warn!("event listener lagged, {skipped} events skipped"),
                Err(RecvError::Closed) => break,
            }
        }
        tally
    });

    let report = engine.resync().await?;
    let metadata = engine.load_metadata().await?;
    println!(
        "Canvas {}x{}, version {}",
        metadata.width,
        metadata.height,
        report.grid.unwrap_or_default()
    );

    let account = Account::new("demo-user");
    store.set_credits(&account, options.credits);
    let credits = engine.sign_in(account.clone()).await?;
    println!("Signed in as {account} with {credits} credits");

    draw(&engine, &options)?;
    println!("{} pixels pending", engine.pending_count());

    if let Some(description) = engine.undo_description() {
        engine.undo()?;
        println!("Undo: {description}");
        engine.redo()?;
    }

    // Someone else holds the first cell's payment lock.
    if let Some(first) = engine.pending_cells().first() {
        store.fail_cell(first.pos, CommitErrorKind::Locked);
    }

    match engine.balance_after_commit() {
        Some(left) => println!("Saving {} pixels, {left} credits left afterwards", engine.pending_count()),
        None => println!("Saving {} pixels with {} credits", engine.pending_count(), engine.credits()),
    }
    match engine.commit().await {
        Err(err @ EngineError::InsufficientCredits { deficit, .. }) => {
            println!("{err}");
            top_up(&engine, &store, &account, deficit, &units).await?;
        }
        Err(err) if err.is_advisory() => println!("{err}"),
        Err(err) => return Err(err.into()),
        Ok(report) => print_commit(&report, &units),
    }

    if engine.pending_count() > 0 {
        let report = engine.commit().await?;
        print_commit(&report, &units);
    }

    // The lock is released; the remaining cell goes through.
    store.clear_cell_failures();
    if engine.pending_count() > 0 {
        let report = engine.commit().await?;
        print_commit(&report, &units);
    }

    println!(
        "Done: version {}, {} credits left, {} pixels pending",
        engine.grid_version(),
        engine.credits(),
        engine.pending_count()
    );

    drop(engine);
    let tally = listener.await?;
    println!(
        "Events: {} cell repaints, {} full repaints (last version {}), {} commits",
        tally.cells, tally.refreshes, tally.last_version, tally.commits
    );
    Ok(())
}

fn draw(engine: &Engine, options: &DemoOptions) -> anyhow::Result<()> {
    for i in 0..options.pixels {
        let pos = CellPos::new(i.wrapping_mul(7) % options.width, i.wrapping_mul(3) % options.height);
        let color = (i % 255 + 1) as u8;
        match engine.set_pixel(pos, color) {
            Ok(_) => log::debug!("drew {} at {pos}", DEFAULT_PALETTE.color(color)),
            Err(err @ EngineError::OverlayFull { .. }) => {
                println!("{err}");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Buys the cheapest plan that covers `deficit` and refreshes the balance.
async fn top_up(engine: &Engine, store: &MemoryStore, account: &Account, deficit: u64, units: &TokenUnits) -> anyhow::Result<()> {
    let plans = &engine.load_metadata().await?.plans;
    let quotes = quote_plans(plans, 10_000);
    let Some(quote) = quotes.iter().find(|quote| quote.credits >= deficit).or(quotes.last()) else {
        println!("No credit plans available");
        return Ok(());
    };
    println!(
        "Buying {} credits for {} ({}% saved)",
        quote.credits,
        units.display(quote.price),
        quote.savings_pct
    );
    store.set_credits(account, engine.credits() + quote.credits);
    engine.refresh_credits().await?;
    Ok(())
}

fn print_commit(report: &CommitReport, units: &TokenUnits) {
    match &report.outcome {
        CommitOutcome::Completed { saved, failures } => {
            println!("Saved {saved} of {} pixels", report.submitted);
            for failure in failures {
                println!("  {}: {}", failure.pos, failure.kind.describe(units));
            }
        }
        CommitOutcome::TransportFailed(err) => println!("{err}"),
    }
    if !report.restore.restored.is_empty() {
        println!("  {} pixels are pending again", report.restore.restored.len());
    }
    match &report.resync {
        Ok(resync) if !resync.is_complete() => println!("  Canvas may be out of date, refresh to retry"),
        Ok(_) => {}
        Err(err) => println!("  {err}"),
    }
}
