use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use farmfeed::api::ImageUpload;
use farmfeed::config::Config;
use farmfeed::engine::{EngineError, EngineSettings, FeedCacheEngine, PageLoaded};
use farmfeed::model::{Entry, FeedEntity, Post, Story};
use farmfeed::{HttpFeedApi, Outcome, PageRequest, PostDraft, PostFilter, StoryDraft, StoryFilter};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Get the config directory path (~/.config/farmfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("farmfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "farmfeed", about = "Browse and post to the Farm Connect community feeds")]
struct Args {
    /// Config file (defaults to ~/.config/farmfeed/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List community posts
    Posts {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Case-insensitive text search over content and author
        #[arg(long)]
        search: Option<String>,
    },
    /// List success stories
    Stories {
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long)]
        search: Option<String>,
        /// Exact category match
        #[arg(long)]
        category: Option<String>,
    },
    /// Show one story
    Story { id: String },
    /// Publish a post
    Post {
        content: String,
        /// Image to attach (repeatable, up to 5)
        #[arg(long = "image", value_name = "FILE")]
        images: Vec<PathBuf>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Publish a success story
    ShareStory {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, value_name = "FILE")]
        cover: Option<PathBuf>,
    },
    /// Toggle your like on a post
    LikePost { id: String },
    /// Toggle your like on a story
    LikeStory { id: String },
    /// Comment on a post
    Comment { post_id: String, content: String },
    DeletePost { id: String },
    DeleteStory { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let api = HttpFeedApi::from_config(&config).context("Failed to create API client")?;
    let engine = FeedCacheEngine::new(Arc::new(api), EngineSettings::from_config(&config));

    match args.command {
        Command::Posts { pages, search } => {
            load_pages(pages, || engine.fetch_posts(PageRequest::first()), || {
                engine.load_more_posts()
            })
            .await?;
            let filter = search.map_or_else(PostFilter::new, |s| PostFilter::new().search(s));
            for entry in engine.visible_posts(&filter) {
                print_post(&entry, &engine.viewer().id);
            }
        }
        Command::Stories {
            pages,
            search,
            category,
        } => {
            load_pages(pages, || engine.fetch_stories(PageRequest::first()), || {
                engine.load_more_stories()
            })
            .await?;
            let mut filter = StoryFilter::new();
            if let Some(search) = search {
                filter = filter.search(search);
            }
            if let Some(category) = category {
                filter = filter.category(category);
            }
            for entry in engine.visible_stories(&filter) {
                print_story(&entry, &engine.viewer().id);
            }
        }
        Command::Story { id } => {
            if let Outcome::Applied(story) = engine.fetch_story_by_id(&id).await? {
                print_story(&Entry::Confirmed(story.clone()), &engine.viewer().id);
                println!();
                println!("{}", story.content);
                for achievement in &story.achievements {
                    println!("  * {}: {}", achievement.label, achievement.value);
                }
                for milestone in &story.timeline {
                    println!("  - {} {}", milestone.date, milestone.event);
                }
            }
        }
        Command::Post {
            content,
            images,
            category,
            location,
            tags,
        } => {
            let mut draft = PostDraft::new(content);
            if let Some(category) = category {
                draft = draft.with_category(category);
            }
            if let Some(location) = location {
                draft = draft.with_location(location);
            }
            for tag in tags {
                draft = draft.with_tag(tag);
            }
            for path in images {
                let image = ImageUpload::from_path(&path)
                    .with_context(|| format!("Failed to read image {}", path.display()))?;
                draft = draft.with_image(image);
            }
            report(engine.create_post(draft).await?, |post| {
                format!("Posted {}", post.id)
            });
        }
        Command::ShareStory {
            title,
            content,
            excerpt,
            category,
            tags,
            cover,
        } => {
            let mut draft = StoryDraft::new(title, content);
            if let Some(excerpt) = excerpt {
                draft = draft.with_excerpt(excerpt);
            }
            if let Some(category) = category {
                draft = draft.with_category(category);
            }
            for tag in tags {
                draft = draft.with_tag(tag);
            }
            if let Some(path) = cover {
                let image = ImageUpload::from_path(&path)
                    .with_context(|| format!("Failed to read cover image {}", path.display()))?;
                draft = draft.with_cover_image(image);
            }
            report(engine.create_story(draft).await?, |story| {
                format!("Shared story {}", story.id)
            });
        }
        Command::LikePost { id } => {
            report(engine.like_post(&id).await?, |likes| {
                format!("{} likes", likes.len())
            });
        }
        Command::LikeStory { id } => {
            report(engine.like_story(&id).await?, |likes| {
                format!("{} likes", likes.len())
            });
        }
        Command::Comment { post_id, content } => {
            report(engine.add_comment(&post_id, &content).await?, |comment| {
                format!("Commented {}", comment.id)
            });
        }
        Command::DeletePost { id } => {
            report(engine.delete_post(&id).await?, |_| format!("Deleted post {id}"));
        }
        Command::DeleteStory { id } => {
            report(engine.delete_story(&id).await?, |_| format!("Deleted story {id}"));
        }
    }

    Ok(())
}

/// Load page 1, then keep loading until `pages` pages are in or the feed ends.
async fn load_pages<F, G, FirstFut, MoreFut>(pages: u32, first: F, more: G) -> Result<()>
where
    F: FnOnce() -> FirstFut,
    G: Fn() -> MoreFut,
    FirstFut: Future<Output = Result<Outcome<PageLoaded>, EngineError>>,
    MoreFut: Future<Output = Result<Outcome<PageLoaded>, EngineError>>,
{
    let mut loaded = first().await.context("Failed to load feed")?;
    for _ in 1..pages {
        match loaded {
            Outcome::Applied(page) if page.has_more => {
                loaded = more().await.context("Failed to load more")?;
            }
            _ => break,
        }
    }
    Ok(())
}

fn report<T>(outcome: Outcome<T>, describe: impl FnOnce(T) -> String) {
    match outcome {
        Outcome::Applied(value) => println!("{}", describe(value)),
        Outcome::Skipped(reason) => println!("Nothing sent: {reason}"),
        Outcome::Queued => println!("Offline, queued for later"),
    }
}

fn liked_marker(liked: bool) -> &'static str {
    if liked {
        ", liked"
    } else {
        ""
    }
}

fn print_post(entry: &Entry<Post>, viewer_id: &str) {
    let post = entry.value();
    let pending = if entry.is_temporary() { " (sending)" } else { "" };
    println!(
        "{}  {}{}  [{} likes{}, {} comments]",
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.author.name,
        pending,
        post.likes.len(),
        liked_marker(post.is_liked_by(viewer_id)),
        post.comments.len()
    );
    println!("    {}", post.content);
}

fn print_story(entry: &Entry<Story>, viewer_id: &str) {
    let story = entry.value();
    println!(
        "{}  {}  by {}  ({} min read, {} likes{})",
        story.created_at.format("%Y-%m-%d"),
        story.title,
        story.author.name,
        story.read_time(),
        story.likes.len(),
        liked_marker(story.is_liked_by(viewer_id))
    );
}
