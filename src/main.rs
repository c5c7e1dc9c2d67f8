//! feedkit - news feed, reactions and posting from the terminal
#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use feedkit::api::{FeedClient, NewPost, PostsApi};
use feedkit::auth::{CredentialStore, StaticTokens, TokenSource, Tokens};
use feedkit::feed::{FeedSnapshot, FeedStore, LoadOutcome};
use feedkit::reactions::{ReactionOutcome, ReactionReconciler, ReactionState, RefetchSignal};
use feedkit::session::{FeedCommand, FeedEvent, FeedSession};
use feedkit::{Config, Post, ReactionKind};

/// Pages scanned when looking up a post by id
const LOOKUP_PAGES: u32 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match parse_args()? {
        Command::Feed {
            search,
            user,
            pages,
        } => feed_cli(search, user, pages).await,
        Command::Browse { viewer } => browse_cli(viewer).await,
        Command::React {
            post_id,
            kind,
            viewer,
        } => react_cli(&post_id, kind, &viewer).await,
        Command::Post { content, group } => post_cli(&content, group).await,
        Command::Delete { post_id } => delete_cli(&post_id).await,
        Command::Login { username } => login_cli(&username).await,
        Command::WpToken { token } => {
            CredentialStore::open_default()?.store_wp_token(&token)?;
            println!("✓ WordPress token saved");
            Ok(())
        }
        Command::Logout => {
            CredentialStore::open_default()?.clear()?;
            println!("✓ Signed out");
            Ok(())
        }
        Command::Config => show_config(),
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
    }
}

/// CLI commands
enum Command {
    Feed {
        search: Option<String>,
        user: Option<String>,
        pages: u32,
    },
    Browse {
        viewer: String,
    },
    React {
        post_id: String,
        kind: Option<ReactionKind>,
        viewer: String,
    },
    Post {
        content: String,
        group: Option<String>,
    },
    Delete {
        post_id: String,
    },
    Login {
        username: String,
    },
    WpToken {
        token: String,
    },
    Logout,
    Config,
    Help,
    Version,
}

/// Value following `flag` (or its short form), if present
fn flag_value(args: &[String], long: &str, short: &str) -> Option<String> {
    args.iter()
        .position(|a| a == long || a == short)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Feed {
            search: None,
            user: None,
            pages: 1,
        });
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "feed" => {
            let pages = flag_value(&args, "--pages", "-p")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            Ok(Command::Feed {
                search: flag_value(&args, "--search", "-s"),
                user: flag_value(&args, "--user", "-u"),
                pages,
            })
        }

        "browse" => Ok(Command::Browse {
            viewer: flag_value(&args, "--as", "-a").unwrap_or_default(),
        }),

        "react" | "like" => {
            let post_id = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing post id"))?
                .clone();
            let kind = match args.get(3).filter(|a| !a.starts_with('-')) {
                Some(name) => Some(
                    ReactionKind::from_str(name)
                        .ok_or_else(|| anyhow::anyhow!("Unknown reaction: {name}"))?,
                ),
                None => None,
            };
            let viewer = flag_value(&args, "--as", "-a").ok_or_else(|| {
                anyhow::anyhow!("Missing viewer id\nExample: feedkit react 123 love --as 42")
            })?;
            Ok(Command::React {
                post_id,
                kind,
                viewer,
            })
        }

        "post" => {
            let content = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing post content"))?
                .clone();
            Ok(Command::Post {
                content,
                group: flag_value(&args, "--group", "-g"),
            })
        }

        "delete" | "rm" => {
            let post_id = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing post id"))?
                .clone();
            Ok(Command::Delete { post_id })
        }

        "login" => {
            let username = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing username or email"))?
                .clone();
            Ok(Command::Login { username })
        }

        "token" => match (args.get(2).map(String::as_str), args.get(3)) {
            (Some("wp"), Some(token)) => Ok(Command::WpToken {
                token: token.clone(),
            }),
            _ => Err(anyhow::anyhow!("Usage: feedkit token wp <value>")),
        },

        "logout" => Ok(Command::Logout),
        "config" => Ok(Command::Config),

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'feedkit --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"📰 feedkit - news feed, reactions and posting from the terminal

USAGE:
    feedkit                            Show the first feed page
    feedkit [COMMAND]

COMMANDS:
    feed [OPTIONS]                     Show the feed
      Options:
        -s, --search <text>            Only posts matching <text>
        -u, --user <id>                Only posts of one user
        -p, --pages <n>                Number of pages (default: 1)

    browse [--as <viewer-id>]          Interactive feed
      Input:
        n                              Load more
        r                              Refresh
        /<text>                        Search (empty clears)
        like <post-id> [kind]          React (like, love, sad, shock, laugh, angry)
        post <text>                    Publish a post
        rm <post-id>                   Delete a post
        q                              Quit

    react <post-id> [kind] --as <id>   React to a post (same kind again removes it)
    post <text> [--group <id>]         Publish a post
    delete <post-id>                   Delete a post

    login <username>                   Sign in (asks for the password)
    token wp <value>                   Store the WordPress token
    logout                             Forget stored tokens
    config                             Show the effective configuration

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

ENVIRONMENT:
    FEEDKIT_TOKEN, FEEDKIT_WP_TOKEN    Use these tokens instead of the stored ones
    RUST_LOG                           Log filter (default: warn)

CONFIG:
    {}
"#,
        config_path
    );
}

fn print_version() {
    println!("feedkit {}", feedkit::VERSION);
}

/// Tokens from the environment when set, otherwise the credential store
fn token_source() -> Result<Arc<dyn TokenSource>> {
    let access = std::env::var("FEEDKIT_TOKEN").ok().filter(|t| !t.is_empty());
    let wp = std::env::var("FEEDKIT_WP_TOKEN").ok().filter(|t| !t.is_empty());

    if access.is_some() || wp.is_some() {
        return Ok(Arc::new(StaticTokens(Tokens { access, wp })));
    }
    Ok(Arc::new(CredentialStore::open_default()?))
}

fn client() -> Result<(Config, FeedClient)> {
    let config = Config::load()?;
    let client = FeedClient::new(config.clone(), token_source()?)?;
    Ok((config, client))
}

fn print_post(post: &Post, viewer: Option<&str>) {
    let time = post.relative_time();
    if time.is_empty() {
        println!("\n[{}] {}", post.id, post.display_name());
    } else {
        println!("\n[{}] {} · {}", post.id, post.display_name(), time);
    }

    if !post.body.is_empty() {
        let options = textwrap::Options::new(78)
            .initial_indent("  ")
            .subsequent_indent("  ");
        println!("{}", textwrap::fill(&post.body, options));
    }
    for url in &post.media {
        println!("  🖼  {}", url);
    }

    let mut counts = format!(
        "  {} {}  💬 {}",
        ReactionKind::Like.emoji(),
        post.likes_count,
        post.comments_count
    );
    if let Some(viewer) = viewer {
        if let ReactionState::Reacting(kind) = ReactionState::of(viewer, &post.reactions) {
            counts.push_str(&format!("  (you: {})", kind.emoji()));
        }
    }
    println!("{}", counts);
}

fn print_snapshot(snapshot: &FeedSnapshot, viewer: Option<&str>) {
    println!(
        "\n── page {}/{} · {} posts {}",
        snapshot.current_page,
        snapshot.total_pages,
        snapshot.posts.len(),
        "─".repeat(30)
    );
    for post in &snapshot.posts {
        print_post(post, viewer);
    }
    if let Some(error) = &snapshot.last_error {
        eprintln!("\n⚠ {}", error);
    }
}

async fn feed_cli(search: Option<String>, user: Option<String>, pages: u32) -> Result<()> {
    let (config, client) = client()?;
    let store = FeedStore::new(client, config.page_size()).with_user_filter(user);
    if let Some(search) = &search {
        store.set_search(search);
    }

    if store.load_first_page().await == LoadOutcome::Failed {
        let error = store.last_error().unwrap_or_default();
        anyhow::bail!("No posts to show: {error}");
    }
    for _ in 1..pages.max(1) {
        match store.load_next_page().await {
            LoadOutcome::Loaded { .. } => {}
            LoadOutcome::Skipped | LoadOutcome::Failed => break,
        }
    }

    let snapshot = store.snapshot();
    if snapshot.posts.is_empty() {
        println!("No posts to show.");
        return Ok(());
    }
    print_snapshot(&snapshot, None);
    Ok(())
}

/// Turn one line of input into a session command
fn parse_browse_line(line: &str) -> Option<std::result::Result<FeedCommand, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(search) = line.strip_prefix('/') {
        return Some(Ok(FeedCommand::SearchInput(search.to_string())));
    }

    let mut words = line.split_whitespace();
    let command = match (words.next(), words.next(), words.next()) {
        (Some("q" | "quit"), ..) => Ok(FeedCommand::Shutdown),
        (Some("n" | "more"), ..) => Ok(FeedCommand::LoadMore),
        (Some("r" | "refresh"), ..) => Ok(FeedCommand::Refresh),
        (Some("like" | "react"), Some(post_id), kind) => match kind {
            None => Ok(FeedCommand::React {
                post_id: post_id.to_string(),
                kind: None,
            }),
            Some(name) => ReactionKind::from_str(name)
                .map(|kind| FeedCommand::React {
                    post_id: post_id.to_string(),
                    kind: Some(kind),
                })
                .ok_or_else(|| format!("Unknown reaction: {name}")),
        },
        (Some("rm" | "delete"), Some(post_id), _) => Ok(FeedCommand::Delete {
            post_id: post_id.to_string(),
        }),
        (Some("post"), Some(_), _) => {
            let text = line.trim_start_matches("post").trim();
            Ok(FeedCommand::Publish(NewPost::text(text)))
        }
        _ => Err(format!("Unknown input: {line} (n, r, /text, like, post, rm, q)")),
    };
    Some(command)
}

async fn read_commands(commands: mpsc::Sender<FeedCommand>) -> Result<()> {
    commands.send(FeedCommand::LoadFirstPage).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_browse_line(&line) {
            None => {}
            Some(Err(message)) => eprintln!("{}", message),
            Some(Ok(command)) => {
                let done = command == FeedCommand::Shutdown;
                commands.send(command).await?;
                if done {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn browse_cli(viewer: String) -> Result<()> {
    let (config, client) = client()?;
    let session = FeedSession::new(Arc::new(client), &viewer, &config);

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);

    let input = tokio::spawn(read_commands(cmd_tx));
    let printer = tokio::spawn(async move {
        let viewer = Some(viewer).filter(|v| !v.is_empty());
        let mut shown: Option<FeedSnapshot> = None;
        while let Some(event) = ev_rx.recv().await {
            match event {
                FeedEvent::Notice(notice) => println!("» {}", notice),
                FeedEvent::Snapshot(snapshot) => {
                    let changed = shown.as_ref().is_none_or(|s| {
                        s.posts != snapshot.posts || s.last_error != snapshot.last_error
                    });
                    if changed {
                        print_snapshot(&snapshot, viewer.as_deref());
                        shown = Some(snapshot);
                    }
                }
            }
        }
    });

    session.run(cmd_rx, ev_tx).await;

    input.abort();
    let _ = printer.await;
    Ok(())
}

/// Page through the feed until `post_id` shows up
async fn find_post(config: &Config, client: FeedClient, post_id: &str) -> Result<Post> {
    let store = FeedStore::new(client, config.page_size());
    if store.load_first_page().await == LoadOutcome::Failed {
        anyhow::bail!(
            "Could not load the feed: {}",
            store.last_error().unwrap_or_default()
        );
    }

    for _ in 0..LOOKUP_PAGES {
        if let Some(post) = store.post(post_id) {
            return Ok(post);
        }
        if !matches!(store.load_next_page().await, LoadOutcome::Loaded { .. }) {
            break;
        }
    }
    store
        .post(post_id)
        .with_context(|| format!("Post {post_id} not found in the first {LOOKUP_PAGES} pages"))
}

async fn react_cli(post_id: &str, kind: Option<ReactionKind>, viewer: &str) -> Result<()> {
    let (config, client) = client()?;
    let post = find_post(&config, client.clone(), post_id).await?;

    let reconciler = ReactionReconciler::new(client, RefetchSignal::new());
    match reconciler
        .apply_reaction(&post.id, viewer, &post.reactions, kind)
        .await
    {
        ReactionOutcome::Applied(action) => {
            println!("✓ {}", action);
            Ok(())
        }
        ReactionOutcome::Failed(_) => Err(anyhow::anyhow!("Could not update the reaction")),
    }
}

async fn post_cli(content: &str, group: Option<String>) -> Result<()> {
    let (_, client) = client()?;
    let post = NewPost {
        group,
        ..NewPost::text(content)
    };

    println!("📝 Publishing {} post...", post.post_type().to_lowercase());
    client.create_post(&post).await?;
    println!("✓ Post published");
    Ok(())
}

async fn delete_cli(post_id: &str) -> Result<()> {
    let (_, client) = client()?;
    let message = client.delete_post(post_id).await?;
    println!("✓ {}", message.unwrap_or_else(|| "Post deleted".to_string()));
    Ok(())
}

async fn login_cli(username: &str) -> Result<()> {
    let config = Config::load()?;
    let store = Arc::new(CredentialStore::open_default()?);
    let client = FeedClient::new(config, store.clone())?;

    println!("🔑 Password for {}:", username.trim());
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    let token = client.login(username, password).await?;
    store.store_access_token(&token)?;

    println!("✓ Signed in as {}", username.trim());
    Ok(())
}

fn show_config() -> Result<()> {
    let path = Config::default_path()?;
    let config = Config::load()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
