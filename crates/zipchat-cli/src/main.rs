//! Sandbox session for the zipchat sync core.
//!
//! Runs the full runtime against the in-memory services: sign in, send
//! text and images, and watch the reconciled view update live. The entry
//! surface mirrors the production one: the postal code comes from a page
//! URL / query string and a missing code falls back to the canonical
//! default-locality URL.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use zipchat_core::models::UserInfo;
use zipchat_core::services::memory::{MemoryBlobs, MemoryIdentity, MemoryPush, MemoryStore};
use zipchat_core::services::{RealtimeStore, Services};
use zipchat_core::store::{MessageBody, ViewState};
use zipchat_core::{
    default_locality_url, ChatError, ClientCommand, ClientRuntime, CoreConfig, ImageFile,
    LocalityKey, UiEvent, DEFAULT_LOCALITY,
};

#[derive(Parser)]
#[command(name = "zipchat")]
#[command(about = "Location-scoped chat sandbox")]
struct Cli {
    /// Page URL or query string carrying the postal code, e.g. "?p=10110"
    #[arg(long, short = 'u')]
    url: Option<String>,

    /// Display name of the sandbox user
    #[arg(long, default_value = "Ada")]
    user: String,

    /// Skip seeding demo emergency contacts
    #[arg(long)]
    no_seed: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("zipchat_core=info,zipchat_cli=info,warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let cli = Cli::parse();

    let locality = match cli.url.as_deref().and_then(LocalityKey::from_query) {
        Some(locality) => locality,
        None => {
            eprintln!("Can't get postal code from URL.");
            eprintln!("Continuing at {}", default_locality_url());
            LocalityKey::new(DEFAULT_LOCALITY).expect("default locality is valid")
        }
    };
    println!("zipchat sandbox, locality {locality}");

    let store = Arc::new(MemoryStore::new());
    let services = Services {
        identity: Arc::new(MemoryIdentity::new(UserInfo::new("sandbox-user", cli.user))),
        store: store.clone(),
        blobs: Arc::new(MemoryBlobs::new("zipchat-sandbox")),
        push: Arc::new(MemoryPush::new()),
    };

    if !cli.no_seed {
        seed_contacts(&store, &locality)?;
    }

    let mut runtime = match ClientRuntime::new(CoreConfig::new(locality), services) {
        Ok(runtime) => runtime,
        Err(error @ ChatError::Setup(_)) => {
            // Blocking notice: nothing else will work, bail out.
            eprintln!("{error}");
            std::process::exit(1);
        }
        Err(error) => return Err(error.into()),
    };

    println!("commands: /signin /signout /image <path> [caption] /stats /quit");
    println!("anything else is sent as a chat message\n");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let line = line?;
        let line = line.trim();

        match line {
            "" => {}
            "/quit" => break,
            "/signin" => {
                let _ = runtime.handle().send(ClientCommand::SignIn);
            }
            "/signout" => {
                let _ = runtime.handle().send(ClientCommand::SignOut);
            }
            "/stats" => {
                println!("{:#?}", runtime.stats().snapshot());
            }
            _ if line.starts_with("/image") => match parse_image(line) {
                Ok((file, caption)) => {
                    let _ = runtime.handle().send(ClientCommand::SendImage { file, caption });
                }
                Err(error) => eprintln!("{error}"),
            },
            text => {
                let _ = runtime.handle().send(ClientCommand::SendText {
                    text: text.to_string(),
                });
            }
        }

        // Give the worker a beat, then render whatever changed.
        let mut events = runtime.wait_and_process(Duration::from_millis(300));
        events.extend(runtime.process_pending());
        render(runtime.view(), &events);
    }

    runtime.shutdown();
    Ok(())
}

fn seed_contacts(store: &Arc<MemoryStore>, locality: &LocalityKey) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let prefix = locality.prefix().to_string();
    rt.block_on(async {
        for (name, address, phone, suffix) in [
            ("District Hospital", "72 Rama Rd", "555-0131", "110"),
            ("Fire Station 3", "9 Charoen St", "555-0172", "230"),
            ("Police Post", "41 Market Ln", "555-0109", "999"),
        ] {
            store
                .push(
                    "contacts",
                    serde_json::json!({
                        "name": name,
                        "address": address,
                        "phone": phone,
                        "postalCode": format!("{prefix}{suffix}"),
                    }),
                )
                .await?;
        }
        Ok::<_, ChatError>(())
    })?;
    Ok(())
}

fn parse_image(line: &str) -> Result<(ImageFile, Option<String>)> {
    let rest = line.trim_start_matches("/image").trim();
    if rest.is_empty() {
        anyhow::bail!("usage: /image <path> [caption]");
    }
    let (path, caption) = match rest.split_once(' ') {
        Some((path, caption)) => (path, Some(caption.trim().to_string())),
        None => (rest, None),
    };
    let bytes = std::fs::read(path)?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok((
        ImageFile {
            content_type: content_type_for(&name),
            name,
            bytes,
        },
        caption,
    ))
}

fn content_type_for(name: &str) -> String {
    let extension = name.rsplit('.').next().unwrap_or_default().to_lowercase();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn render(view: &ViewState, events: &[UiEvent]) {
    for event in events {
        match event {
            UiEvent::Notice { message, .. } => println!("  [notice] {message}"),
            UiEvent::ClearCompose => println!("  [compose cleared]"),
            _ => {}
        }
    }

    match &view.profile {
        Some(profile) => println!("  signed in as {}", profile.name),
        None => println!("  signed out"),
    }

    for node in &view.messages {
        match &node.body {
            MessageBody::Text { lines } => {
                println!("  {}: {}", node.author_name, lines.join(" / "));
            }
            MessageBody::Image { src, caption } => {
                let caption = caption.as_deref().unwrap_or("");
                println!("  {}: [image {src}] {caption}", node.author_name);
            }
            MessageBody::Empty => println!("  {}: (empty)", node.author_name),
        }
    }
    if !view.events.is_empty() {
        println!("  gallery: {} entries", view.events.len());
    }
    for contact in &view.contacts {
        println!(
            "  contact: {} | {} | {}",
            contact.name, contact.phone, contact.address
        );
    }
    println!();
}
