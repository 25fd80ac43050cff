use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use portal_feed::logger::{self, LogConfig};
use portal_feed::render::{render_feed, render_notice};
use portal_feed::{
    Commit, Entry, FeedController, FeedEntry, HeadModel, HttpFetcher, Layout, Notice, PortalConfig, Viewport,
};

type Controller = FeedController<HttpFetcher<Entry>, HeadModel>;

/// Walks a detail feed the way a reader scrolling down the page would.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Section slug, e.g. journalist or campus-corner
    #[arg(short, long)]
    section: String,

    /// Id of the entry the page opens on
    #[arg(long)]
    start: i64,

    #[arg(short, long, default_value = "portal.yaml")]
    config: String,

    /// Stop after this many entries
    #[arg(short, long)]
    limit: Option<usize>,

    /// Retries for the first entry
    #[arg(long, default_value_t = 0)]
    retries: u32,

    #[arg(long, default_value_t = 800.0)]
    viewport_height: f64,

    /// Rendered height of every entry in the simulated page
    #[arg(long, default_value_t = 1200.0)]
    entry_height: f64,

    /// Print the document head after every active-entry change
    #[arg(long)]
    head: bool,

    /// Print the rendered feed at the end
    #[arg(long)]
    html: bool,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(LogConfig::new(&args.log_level, args.log_file.clone()))?;

    let config = PortalConfig::load(&args.config)?;
    let section = config.section(&args.section)?.clone();
    let fetcher = HttpFetcher::<Entry>::new(&config, &section)?;
    let mut feed = FeedController::new(fetcher, HeadModel::new("/"), &config, &section);

    // simulated page clock, advanced by `walk` one scroll step at a time
    let mut clock = Instant::now();
    let mut commit = feed.open_and_load(args.start, clock).await;
    let mut attempts = 0;
    while commit == Some(Commit::Failed) && attempts < args.retries {
        attempts += 1;
        commit = feed.retry_and_load(clock).await;
    }
    if feed.notice() == Some(Notice::InitialLoadFailed) {
        if args.html {
            print!("{}", render_notice(Notice::InitialLoadFailed));
        }
        bail!("Could not load entry {} from section {}", args.start, section.slug);
    }
    report(&feed, args.head);

    walk(&mut feed, &args, &config, &mut clock).await;

    match feed.notice() {
        Some(Notice::DuplicateContent) => println!("Stopped: duplicate content detected"),
        Some(_) => println!("Reached the end of the feed"),
        None => println!("Stopped after {} entries", feed.entries().len()),
    }
    if args.html {
        print!("{}", render_feed(feed.entries(), feed.notice(), &config.media_base_url));
    }

    Ok(())
}

/// Scroll down half a viewport at a time, loading and promoting as the page would.
async fn walk(feed: &mut Controller, args: &Args, config: &PortalConfig, clock: &mut Instant) {
    let step = (args.viewport_height / 2.0).max(1.0);
    let tick = config.scroll_throttle().max(config.rescan_delay());
    let mut scroll_y: f64 = 0.0;

    loop {
        if args.limit.is_some_and(|limit| feed.entries().len() >= limit) {
            info!("Entry limit reached");
            break;
        }

        let layout = layout(feed, args.entry_height);
        let viewport = Viewport::new(scroll_y, args.viewport_height);
        *clock += tick;

        if feed.tick(*clock, &viewport, &layout).is_some() {
            report(feed, args.head);
        }
        let outcome = feed.on_scroll(*clock, &viewport, &layout);
        if outcome.promoted.is_some() {
            report(feed, args.head);
        }
        if let Some(ticket) = outcome.ticket {
            feed.load(ticket, *clock).await;
            continue;
        }

        let max_scroll = (layout.document_height - args.viewport_height).max(0.0);
        if scroll_y >= max_scroll && !feed.has_more() {
            break;
        }
        scroll_y = (scroll_y + step).min(max_scroll);
    }

    // let the last appended entry settle into view
    let layout = layout(feed, args.entry_height);
    let bottom = Viewport::new(
        (layout.document_height - args.viewport_height).max(0.0),
        args.viewport_height,
    );
    *clock += tick;
    if feed.tick(*clock, &bottom, &layout).is_some() {
        report(feed, args.head);
    }
}

fn layout(feed: &Controller, entry_height: f64) -> Layout {
    Layout::stacked(0.0, feed.entries().iter().map(|e| (e.id(), entry_height)))
}

fn report(feed: &Controller, head: bool) {
    let Some(entry) = feed.active_entry() else {
        return;
    };
    println!("{}\t{}", feed.sink().path(), feed.synchronizer().page_title(entry));
    if head {
        println!("{}", feed.sink().to_html());
    }
}
