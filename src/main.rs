//! CLI entry point for `mmskit`.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

use mmskit::config::{self, Config};
use mmskit::model::attachment::{Attachment, MediaInference, MediaKind};
use mmskit::model::message::{
    Mailbox, Message, MessageId, MessageKind, RecipientType, SimIndex,
};
use mmskit::service::{MessageService, SearchFilter};
use mmskit::store::FileStore;

#[derive(Parser)]
#[command(name = "mmskit", version, about = "Compose, store and read SMS/MMS messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Message store directory (overrides the config file)
    #[arg(long, global = true, value_name = "DIR", env = "MMSKIT_STORE")]
    store: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a message and send it or save it as a draft
    Compose {
        /// Recipient address (repeatable)
        #[arg(long = "to", value_name = "ADDRESS")]
        to: Vec<String>,
        /// Carbon-copy recipient (MMS only, repeatable)
        #[arg(long, value_name = "ADDRESS")]
        cc: Vec<String>,
        /// Blind-copy recipient (MMS only, repeatable)
        #[arg(long, value_name = "ADDRESS")]
        bcc: Vec<String>,
        /// Message text
        #[arg(long)]
        text: Option<String>,
        /// Subject (MMS only)
        #[arg(long)]
        subject: Option<String>,
        /// Attachment as KIND:PATH, KIND one of image, audio, video, unknown
        #[arg(long = "attach", value_name = "KIND:PATH", value_parser = parse_attachment)]
        attach: Vec<Attachment>,
        /// Send as SMS instead of MMS
        #[arg(long, conflicts_with_all = ["subject", "attach", "cc", "bcc"])]
        sms: bool,
        /// SIM slot to send from (1 or 2)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=2))]
        sim: Option<u8>,
        /// Save into the draft box instead of sending
        #[arg(long)]
        draft: bool,
        /// Keep the sent message in the outbox rather than the sent box
        #[arg(long, conflicts_with = "draft")]
        outbox: bool,
    },
    /// Show one stored message
    Show {
        id: MessageId,
        #[arg(long)]
        json: bool,
    },
    /// List stored messages
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Case-insensitive text or subject search
        #[arg(long)]
        keyword: Option<String>,
        /// Recipient address substring
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Count stored messages
    Count {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print the media kind inferred for attachment paths
    Infer {
        #[arg(required = true)]
        paths: Vec<String>,
        /// Use the conventional extension table instead of the configured one
        #[arg(long)]
        extension: bool,
    },
    /// Print the effective configuration, or write it with --init
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// all, inbox, outbox, sentbox, draft
    #[arg(long, default_value = "all", value_parser = parse_mailbox)]
    mailbox: Mailbox,
    /// sms, mms, cb, push, etws-primary, etws-secondary
    #[arg(long, value_parser = parse_kind)]
    kind: Option<MessageKind>,
}

fn parse_attachment(s: &str) -> Result<Attachment, String> {
    Attachment::parse_spec(s).map_err(|e| e.to_string())
}

fn parse_mailbox(s: &str) -> Result<Mailbox, String> {
    Mailbox::from_name(s).ok_or_else(|| format!("unknown mailbox '{s}'"))
}

fn parse_kind(s: &str) -> Result<MessageKind, String> {
    MessageKind::from_name(s).ok_or_else(|| format!("unknown message kind '{s}'"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = config::load_config();
    if let Some(ref dir) = cli.store {
        config.store.path = Some(dir.clone());
    }

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Compose {
            to,
            cc,
            bcc,
            text,
            subject,
            attach,
            sms,
            sim,
            draft,
            outbox,
        } => {
            let kind = if sms { MessageKind::Sms } else { MessageKind::Mms };
            let mut message = Message::new(kind)?;
            for address in &to {
                message.add_address(address, RecipientType::To)?;
            }
            for address in &cc {
                message.add_address(address, RecipientType::Cc)?;
            }
            for address in &bcc {
                message.add_address(address, RecipientType::Bcc)?;
            }
            if let Some(slot) = sim {
                message.set_sim_id(SimIndex::from_number(slot));
            }
            if let Some(ref text) = text {
                message.set_text(text)?;
            }
            if let Some(ref subject) = subject {
                message.set_subject(subject)?;
            }
            for attachment in attach {
                message.add_attachment(attachment.media_kind, &attachment.filepath)?;
            }
            cmd_compose(&config, message, draft, outbox)
        }
        Commands::Show { id, json } => cmd_show(&config, id, json),
        Commands::List {
            filter,
            keyword,
            address,
            offset,
            limit,
            json,
        } => {
            let filter = SearchFilter {
                mailbox: filter.mailbox,
                kind: filter.kind,
                keyword,
                address,
                offset,
                limit,
            };
            cmd_list(&config, &filter, json)
        }
        Commands::Count { filter } => cmd_count(&config, filter.mailbox, filter.kind),
        Commands::Infer { paths, extension } => {
            let inference = if extension {
                MediaInference::Extension
            } else {
                config.parse.media_inference
            };
            cmd_infer(&paths, inference);
            Ok(())
        }
        Commands::Config { init } => cmd_config(&config, init),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = config::log_file_path(config);
    let log_dir = config::cache_dir(config);
    let file_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "mmskit.log".into());
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn open_service(config: &Config) -> anyhow::Result<MessageService<FileStore>> {
    let store = FileStore::from_config(config)?;
    Ok(MessageService::from_config(store, config))
}

/// Store a composed message and print its id.
fn cmd_compose(config: &Config, mut message: Message, draft: bool, outbox: bool) -> anyhow::Result<()> {
    let mut service = open_service(config)?;
    let id = if draft {
        service.save_draft(&mut message)?
    } else {
        service.send_message(&mut message, !outbox)?
    };
    println!("  Stored {} {} in {}", message.kind(), id, message.mailbox());
    Ok(())
}

/// Print one message.
fn cmd_show(config: &Config, id: MessageId, json: bool) -> anyhow::Result<()> {
    let mut service = open_service(config)?;
    let message = service.search_message_by_id(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&message_json(&message))?);
    } else {
        print_message(&message);
    }
    Ok(())
}

/// Print the messages matching `filter`.
fn cmd_list(config: &Config, filter: &SearchFilter, json: bool) -> anyhow::Result<()> {
    let mut service = open_service(config)?;
    let messages = service.search_messages(filter)?;

    if json {
        let items: Vec<serde_json::Value> = messages.iter().map(message_json).collect();
        let output = serde_json::json!({
            "result_count": messages.len(),
            "results": items,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {} message(s)", messages.len());
    println!();
    if messages.is_empty() {
        return Ok(());
    }

    println!(
        "  {:<6} {:<5} {:<8} {:<17} {:<25} {:<30}",
        "Id", "Kind", "Box", "Date", "To", "Text"
    );
    println!("  {}", "-".repeat(96));
    for message in &messages {
        let date = message
            .timestamp()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let to: String = message
            .address(0)
            .map(|r| r.address.chars().take(24).collect())
            .unwrap_or_default();
        let text: String = message
            .text()
            .unwrap_or_default()
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(29)
            .collect();
        println!(
            "  {:<6} {:<5} {:<8} {:<17} {:<25} {:<30}",
            message.id().unwrap_or_default(),
            message.kind(),
            message.mailbox(),
            date,
            to,
            text
        );
    }
    println!();
    Ok(())
}

fn cmd_count(config: &Config, mailbox: Mailbox, kind: Option<MessageKind>) -> anyhow::Result<()> {
    let mut service = open_service(config)?;
    println!("{}", service.count_messages(mailbox, kind)?);
    Ok(())
}

fn cmd_infer(paths: &[String], inference: MediaInference) {
    for path in paths {
        println!("{:<8} {}", MediaKind::from_filepath(path, inference), path);
    }
}

/// Show or write the configuration.
fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    let path = config::config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    if init {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        config::save_config(config)?;
        println!("  Wrote {}", path.display());
        return Ok(());
    }
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mmskit", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print a message in a human-readable layout.
fn print_message(message: &Message) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<12} {}", "Id", message.id().unwrap_or_default());
    println!("  {:<12} {}", "Kind", message.kind());
    println!("  {:<12} {}", "Mailbox", message.mailbox());
    if message.sim_id() != SimIndex::Unknown {
        println!("  {:<12} {:?}", "SIM", message.sim_id());
    }
    if let Some(ts) = message.timestamp() {
        println!("  {:<12} {}", "Date", ts.format("%Y-%m-%d %H:%M:%S"));
    }
    for recipient in message.addresses() {
        println!("  {:<12} {}", format!("{:?}", recipient.recipient_type), recipient.address);
    }
    if let Ok(Some(subject)) = message.subject() {
        println!("  {:<12} {}", "Subject", subject);
    }

    if !message.attachments().is_empty() {
        println!();
        println!("  Attachments:");
        for attachment in message.attachments() {
            let size = std::fs::metadata(&attachment.filepath)
                .map(|m| format_size(m.len(), BINARY))
                .unwrap_or_else(|_| "missing".to_string());
            println!(
                "    {:<8} {:>10}  {}",
                attachment.media_kind, size, attachment.filepath
            );
        }
    }

    if let Some(text) = message.text() {
        println!();
        for line in text.lines() {
            println!("  {line}");
        }
    }
    println!();
}

fn message_json(message: &Message) -> serde_json::Value {
    serde_json::json!({
        "id": message.id(),
        "kind": message.kind(),
        "mailbox": message.mailbox(),
        "date": message.timestamp().map(|t| t.to_rfc3339()),
        "addresses": message.addresses(),
        "subject": message.subject().ok().flatten(),
        "text": message.text(),
        "attachments": message.attachments(),
        "sim": message.sim_id(),
    })
}
