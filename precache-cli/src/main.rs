use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use precache_engine::cache::{CacheProvider, CacheStorage, open_storage};
use precache_engine::{
    AnnouncementPolicy, CacheProxy, CacheStatus, CancellationToken, HostMessage, HttpProxyConfig,
    InstallOutcome, MessageOutcome, ProxyConfig, Request, StorageConfig,
};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use url::Url;

mod cli;
mod error;
mod utils;

use cli::{CliArgs, Command, GlobalArgs};
use error::AppError;
use utils::{format_bytes, parse_headers};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let log_level = if args.global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                token.cancel();
            }
        });
    }

    match args.command {
        Command::Install {
            scope,
            filename,
            policy,
        } => {
            let config = build_config(&args.global, &scope, policy)?;
            install(config, &filename, &token).await
        }
        Command::Fetch {
            scope,
            urls,
            output,
            headers,
        } => {
            let config = build_config(&args.global, &scope, AnnouncementPolicy::default())?;
            fetch(config, &urls, output, &headers, &token).await
        }
        Command::List => list(&storage_config(&args.global)).await,
    }
}

fn storage_config(global: &GlobalArgs) -> StorageConfig {
    match &global.cache_dir {
        Some(root) => StorageConfig::File { root: root.clone() },
        None => StorageConfig::default(),
    }
}

fn build_config(
    global: &GlobalArgs,
    scope: &str,
    policy: AnnouncementPolicy,
) -> Result<ProxyConfig, AppError> {
    let scope = Url::parse(scope)
        .map_err(|e| AppError::InvalidInput(format!("Invalid scope URL '{scope}': {e}")))?;

    let mut builder = ProxyConfig::builder()
        .with_scope(scope)
        .with_cache_name(global.cache_name.clone())
        .with_announcement_policy(policy)
        .with_storage(storage_config(global))
        .with_timeout(Duration::from_secs(global.timeout))
        .with_system_proxy(!global.no_system_proxy);

    if let Some(proxy_url) = &global.proxy {
        info!(proxy_url = %proxy_url, "Using explicit proxy configuration");
        builder = builder.with_proxy(HttpProxyConfig::from_url(proxy_url.clone()));
    }
    if let Some(user_agent) = &global.user_agent {
        builder = builder.with_user_agent(user_agent.clone());
    }

    Ok(builder.build())
}

async fn install(
    config: ProxyConfig,
    filenames: &[String],
    token: &CancellationToken,
) -> Result<(), AppError> {
    let proxy = CacheProxy::from_config(config).await?;

    for filename in filenames {
        match proxy.on_message(&HostMessage::announcement(filename)) {
            MessageOutcome::Armed { target } => {
                info!(path = %target.relative_path(), "Asset announced")
            }
            MessageOutcome::AlreadyArmed => {
                warn!(filename = %filename, "Announcement declined by policy")
            }
            MessageOutcome::Ignored => {}
        }
    }

    match proxy.install_with_cancel(token).await? {
        InstallOutcome::NothingToPrecache => info!("Nothing to precache"),
        InstallOutcome::Precached(urls) => {
            for url in urls {
                println!("precached {url}");
            }
        }
    }
    Ok(())
}

fn resolve_request_url(scope: &Url, raw: &str) -> Result<Url, AppError> {
    Url::parse(raw)
        .or_else(|_| scope.join(raw))
        .map_err(|e| AppError::InvalidInput(format!("Invalid request URL '{raw}': {e}")))
}

async fn fetch(
    config: ProxyConfig,
    urls: &[String],
    output: Option<PathBuf>,
    headers: &[String],
    token: &CancellationToken,
) -> Result<(), AppError> {
    if output.is_some() && urls.len() != 1 {
        return Err(AppError::InvalidInput(
            "--output requires exactly one URL".to_string(),
        ));
    }

    let scope = config.scope.clone();
    let proxy = CacheProxy::from_config(config).await?;
    let headers = parse_headers(headers);

    for raw in urls {
        let mut request = Request::get(resolve_request_url(&scope, raw)?);
        request.headers = headers.clone();

        let (response, status) = tokio::select! {
            _ = token.cancelled() => return Err(precache_engine::ProxyError::Cancelled.into()),
            result = proxy.fetch_with_status(request) => result?,
        };

        let source = match status {
            CacheStatus::Hit => "cache",
            CacheStatus::Miss => "network",
        };
        info!(
            url = %response.url,
            status = %response.status,
            source,
            size = %format_bytes(response.body.len() as u64),
            "Fetched"
        );

        match &output {
            Some(path) => tokio::fs::write(path, &response.body).await?,
            None => println!(
                "{} {} {} {}",
                source,
                response.status.as_u16(),
                response.body.len(),
                response.url
            ),
        }
    }
    Ok(())
}

async fn list(storage: &StorageConfig) -> Result<(), AppError> {
    let storage = open_storage(storage).await?;

    for name in storage.names().await? {
        println!("{name}");
        if let Some(cache) = storage.lookup(&name).await? {
            for key in cache.keys().await? {
                println!("  {key}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(cache_dir: Option<PathBuf>) -> GlobalArgs {
        GlobalArgs {
            cache_dir,
            cache_name: "autograder".to_string(),
            verbose: false,
            timeout: 5,
            proxy: Some("socks5://127.0.0.1:1080".to_string()),
            no_system_proxy: true,
            user_agent: Some("grader/1.0".to_string()),
        }
    }

    #[test]
    fn test_build_config_from_args() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_config(
            &global(Some(dir.path().to_path_buf())),
            "https://host/app/sw.js",
            AnnouncementPolicy::Accumulate,
        )
        .unwrap();

        assert_eq!(config.scope.as_str(), "https://host/app/sw.js");
        assert_eq!(config.announcement_policy, AnnouncementPolicy::Accumulate);
        assert_eq!(
            config.storage,
            StorageConfig::File {
                root: dir.path().to_path_buf()
            }
        );
        assert_eq!(config.network.timeout, Duration::from_secs(5));
        assert_eq!(config.network.user_agent, "grader/1.0");
        assert!(!config.network.use_system_proxy);
        assert!(config.network.proxy.is_some());
    }

    #[test]
    fn test_build_config_rejects_bad_scope() {
        let err = build_config(&global(None), "not a url", AnnouncementPolicy::KeepFirst)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_resolve_request_url() {
        let scope = Url::parse("https://host/app/sw.js").unwrap();
        assert_eq!(
            resolve_request_url(&scope, "app.bin").unwrap().as_str(),
            "https://host/app/app.bin"
        );
        assert_eq!(
            resolve_request_url(&scope, "https://cdn/x.js").unwrap().as_str(),
            "https://cdn/x.js"
        );
    }
}
