//! Curator - drag-to-rank for paginated content lists.
//!
//! Command-line front end: inspect a page and apply reorders to it.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curator::{
    dispatch::CancellationSource,
    ranking::{CategoryFilter, Direction, DragEffect, EntityKind, FilterState, ItemId},
    CmsClient, CuratorConfig, Reconciler, RefreshPolicy, SaveOutcome,
};

/// Reorder content lists in the CMS.
#[derive(Parser)]
#[command(name = "curator", about = "Drag-to-rank for content lists")]
struct Cli {
    #[command(flatten)]
    cms: CmsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CmsArgs {
    /// CMS base URL.
    #[arg(long, global = true, env = "CURATOR_CMS_URL", default_value = "http://localhost:8080")]
    cms_url: String,

    /// Bearer token for the CMS API.
    #[arg(long, global = true, env = "CURATOR_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Items per page.
    #[arg(long, global = true, default_value_t = curator::config::DEFAULT_PAGE_SIZE)]
    page_size: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one page of a collection with its ranks.
    Page {
        /// Collection: regions, photo-collections, activities.
        #[arg(long, value_parser = parse_kind)]
        kind: EntityKind,

        /// Page number (1-based).
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Search text.
        #[arg(long, default_value = "")]
        search: String,

        /// Category filter ("all" for none).
        #[arg(long, default_value = "all")]
        category: String,
    },

    /// Reorder items on one page and optionally save.
    Reorder {
        /// Collection: regions, photo-collections, activities.
        #[arg(long, value_parser = parse_kind)]
        kind: EntityKind,

        /// Page number (1-based).
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Drag ACTIVE onto OVER, e.g. `--drag kayak:museum`. Repeatable.
        #[arg(long = "drag", value_parser = parse_drag)]
        drags: Vec<(ItemId, ItemId)>,

        /// Move an item one slot, e.g. `--nudge kayak:up`. Repeatable.
        #[arg(long = "nudge", value_parser = parse_nudge)]
        nudges: Vec<(ItemId, Direction)>,

        /// Write the changes (otherwise only preview them).
        #[arg(long)]
        save: bool,

        /// Maximum rank writes in flight.
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Refetch the page even if some writes fail.
        #[arg(long)]
        refresh_always: bool,
    },
}

fn parse_kind(s: &str) -> std::result::Result<EntityKind, String> {
    EntityKind::parse(s).ok_or_else(|| format!("unknown collection '{}'", s))
}

fn parse_drag(s: &str) -> std::result::Result<(ItemId, ItemId), String> {
    let (active, over) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ACTIVE:OVER, got '{}'", s))?;
    Ok((ItemId::new(active.trim()), ItemId::new(over.trim())))
}

fn parse_nudge(s: &str) -> std::result::Result<(ItemId, Direction), String> {
    let (id, direction) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ID:up or ID:down, got '{}'", s))?;
    let direction = match direction.trim().to_lowercase().as_str() {
        "up" => Direction::Up,
        "down" => Direction::Down,
        other => return Err(format!("unknown direction '{}'", other)),
    };
    Ok((ItemId::new(id.trim()), direction))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = CuratorConfig::new(cli.cms.cms_url).with_page_size(cli.cms.page_size);
    if let Some(token) = cli.cms.api_token {
        config = config.with_api_token(token);
    }

    match cli.command {
        Commands::Page {
            kind,
            page,
            search,
            category,
        } => {
            let filter = FilterState::unfiltered()
                .with_search(search)
                .with_category(CategoryFilter::parse(&category));
            show_page(&config, kind, page, filter).await?;
        }

        Commands::Reorder {
            kind,
            page,
            drags,
            nudges,
            save,
            max_concurrent,
            refresh_always,
        } => {
            let config = config
                .with_max_concurrent_writes(max_concurrent)
                .with_refresh_policy(if refresh_always {
                    RefreshPolicy::Always
                } else {
                    RefreshPolicy::OnSuccess
                });
            reorder(&config, kind, page, &drags, &nudges, save).await?;
        }
    }

    Ok(())
}

fn print_rows<'a>(rows: impl Iterator<Item = (usize, &'a ItemId, String)>) {
    println!("{:<6} {:<32} {:<10}", "SLOT", "ID", "RANK");
    println!("{}", "-".repeat(50));
    for (slot, id, rank) in rows {
        println!("{:<6} {:<32} {:<10}", slot, id, rank);
    }
}

/// Print one page with its persisted ranks.
async fn show_page(config: &CuratorConfig, kind: EntityKind, number: u32, filter: FilterState) -> Result<()> {
    let client = CmsClient::new(config, kind);
    let mut reconciler = Reconciler::new(client.clone(), client, kind.policy(), config);
    reconciler.open(filter, number).await?;

    let session = reconciler.session();
    let page = session.page();
    println!(
        "{} - page {} of {} ({})",
        kind.collection(),
        page.number(),
        page.total_pages(),
        session.policy().field_name
    );
    print_rows(
        page.items()
            .iter()
            .enumerate()
            .map(|(slot, item)| (slot, &item.id, item.rank.to_string())),
    );
    if !curator::ranking::can_rank(session.filter()) {
        println!("\nView is filtered - clear search and category to reorder.");
    }

    Ok(())
}

/// Apply moves to one page, preview the changeset and optionally save it.
async fn reorder(
    config: &CuratorConfig,
    kind: EntityKind,
    number: u32,
    drags: &[(ItemId, ItemId)],
    nudges: &[(ItemId, Direction)],
    save: bool,
) -> Result<()> {
    let client = CmsClient::new(config, kind);
    let source = CancellationSource::new();
    let mut reconciler = Reconciler::new(client.clone(), client, kind.policy(), config)
        .with_cancellation(source.token());

    reconciler.load_page(number).await?;
    if !reconciler.enable_ranking() {
        anyhow::bail!("Ranking mode could not be enabled");
    }

    for (active, over) in drags {
        if let DragEffect::Ignored(reason) = reconciler.on_drag_end(active, over) {
            tracing::warn!(active = %active, over = %over, reason = ?reason, "Drag ignored");
        }
    }
    for (id, direction) in nudges {
        if let DragEffect::Ignored(reason) = reconciler.nudge(id, *direction) {
            tracing::warn!(item = %id, reason = ?reason, "Nudge ignored");
        }
    }

    let session = reconciler.session();
    let changeset = curator::ranking::diff(
        session.page(),
        session.buffer(),
        session.policy(),
        session.page_base_offset(),
    );
    println!("{} - page {} ({})", kind.collection(), number, session.policy().field_name);
    print_rows(session.buffer().current().iter().enumerate().map(|(slot, id)| {
        let rank = changeset
            .rank_of(id)
            .map(|r| format!("-> {}", r))
            .unwrap_or_else(|| "unchanged".to_string());
        (slot, id, rank)
    }));

    if !save {
        println!("\n{} change(s). Re-run with --save to write them.", changeset.len());
        return Ok(());
    }

    // Ctrl-C abandons writes still in flight.
    let cancel = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            source.cancel();
        }
    });

    let outcome = reconciler.save().await?;
    cancel.abort();

    println!("\n{}", outcome.notification());
    match &outcome {
        SaveOutcome::Failed(report)
        | SaveOutcome::Cancelled(report)
        | SaveOutcome::RefreshFailed { report, .. } => {
            for failure in report.failed() {
                if let Err(e) = &failure.result {
                    println!("  {} (rank {}): {}", failure.id, failure.rank, e);
                }
            }
            anyhow::bail!("{}", outcome.notification());
        }
        _ => Ok(()),
    }
}
