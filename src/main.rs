use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fotodav::config::Config;
use fotodav::db::Database;
use fotodav::favorites::FavoritesStore;
use fotodav::models::NextcloudCredentials;
use fotodav::photo_cache::PhotoCache;
use fotodav::photo_library::PhotoLibrary;
use fotodav::secure_store::{SecureStore, CREDENTIALS_KEY};
use fotodav::webdav_service::WebDAVService;

#[derive(Parser)]
#[command(name = "fotodav", version, about = "Headless Nextcloud photo library client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check and store Nextcloud credentials
    Login {
        #[arg(long)]
        server: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Test the connection with the stored credentials
    Check,
    /// List the photos in the remote folder
    List {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Fetch the photo list and cache every image locally
    Sync {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Upload a photo and refresh the listing
    Upload {
        file: PathBuf,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Manage the favorites list
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Manage the local image cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Create the local photo database schema
    InitDb,
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    Add { uri: String },
    Remove { uri: String },
}

#[derive(Subcommand)]
enum CacheAction {
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Login {
            server,
            username,
            password,
        } => {
            let credentials = NextcloudCredentials {
                server,
                username,
                password,
            };
            let service = WebDAVService::new(
                credentials.clone(),
                config.timeout_seconds,
                config.image_extensions.clone(),
            )?;

            let check = service.test_connection().await?;
            if !check.success {
                return Err(anyhow!("{}", check.message));
            }

            SecureStore::new(&config.data_dir)
                .save(CREDENTIALS_KEY, &credentials)
                .await?;
            match check.server_version {
                Some(version) => println!("Connected to Nextcloud {}. Credentials saved.", version),
                None => println!("Connected. Credentials saved."),
            }
        }
        Command::Check => {
            let store = SecureStore::new(&config.data_dir);
            let credentials: NextcloudCredentials = store
                .load(CREDENTIALS_KEY)
                .await?
                .ok_or_else(|| anyhow!("No stored credentials found. Run `fotodav login` first."))?;

            let service = WebDAVService::new(
                credentials,
                config.timeout_seconds,
                config.image_extensions.clone(),
            )?;
            let check = service.test_connection().await?;
            println!("{}", check.message);
            if let Some(version) = check.server_version {
                println!("Server version: {}", version);
            }
            if !check.success {
                std::process::exit(1);
            }
        }
        Command::List { folder } => {
            let mut library = PhotoLibrary::initialize(config).await?;
            let photos = library.fetch_photos(folder.as_deref()).await?;
            if photos.is_empty() {
                println!("No photos available");
            } else {
                for photo in photos {
                    println!("{}", photo.uri);
                }
            }
        }
        Command::Sync { folder } => {
            let mut library = PhotoLibrary::initialize(config).await?;
            let paths = library.sync(folder.as_deref()).await?;
            for path in &paths {
                println!("{}", path.display());
            }
            println!("Cached {} of {} photos", paths.len(), library.photos().len());
        }
        Command::Upload { file, folder } => {
            let mut library = PhotoLibrary::initialize(config).await?;
            library.upload_photo(&file, folder.as_deref()).await?;
            println!(
                "Uploaded {}. Folder now has {} photos.",
                file.display(),
                library.photos().len()
            );
        }
        Command::Favorites { action } => {
            let store = FavoritesStore::new(&config.data_dir);
            match action {
                FavoritesAction::List => {
                    let favorites = store.list().await?;
                    if favorites.is_empty() {
                        println!("No favorite photos yet");
                    } else {
                        for favorite in favorites {
                            println!("{}", favorite.uri);
                        }
                    }
                }
                FavoritesAction::Add { uri } => {
                    let favorite = store.add(&uri).await?;
                    println!("Added favorite {}", favorite.uri);
                }
                FavoritesAction::Remove { uri } => {
                    if store.remove(&uri).await? {
                        println!("Removed favorite {}", uri);
                    } else {
                        println!("Not a favorite: {}", uri);
                    }
                }
            }
        }
        Command::Cache { action } => match action {
            CacheAction::Clear => {
                PhotoCache::new(&config.cache_dir).clear().await?;
                println!("Cache cleared");
            }
        },
        Command::InitDb => {
            tokio::fs::create_dir_all(&config.data_dir).await?;
            let db = Database::new(&config.database_url).await?;
            db.setup().await?;
            println!("Database ready at {}", config.database_url);
        }
    }

    Ok(())
}
