pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod token_pool;
pub mod twitter;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::Config::load();

    init_tracing(&cfg);

    // token 池为空时直接拒绝启动。
    let pool = token_pool::TokenPool::new(cfg.bearer_tokens.clone())
        .context("初始化 token 池失败")?;
    tracing::info!("已加载 {} 个 Twitter token", pool.len());
    let rotator = Arc::new(token_pool::TokenRotator::new(pool));

    let transport =
        twitter::client::HttpTransport::new(&cfg).context("初始化 HTTP 客户端失败")?;
    let client = twitter::client::TwitterClient::new(transport, rotator, cfg.log_level());
    let endpoint = twitter::client::TimelineEndpoint::from_config(&cfg);

    let state = Arc::new(gateway::feed::FeedState {
        service: gateway::feed::FeedService::new(client, endpoint, cache::DEFAULT_CACHE_TTL),
        log_level: cfg.log_level(),
    });
    let app = gateway::feed::router(state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], cfg.port)));

    tracing::info!("Server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("绑定监听端口失败")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务异常退出")?;

    Ok(())
}

fn init_tracing(cfg: &config::Config) {
    // DEBUG 控制请求/响应详情块；普通日志由 RUST_LOG 决定，本项目日志至少 info（DEBUG=high 时为 debug）。
    let own = if cfg.log_level().raw_enabled() {
        "tweetboard=debug"
    } else {
        "tweetboard=info"
    };
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let env = env.trim();
    let filter = if env.is_empty() {
        EnvFilter::new(format!("warn,{own}"))
    } else if env.contains("tweetboard") {
        EnvFilter::new(env)
    } else {
        EnvFilter::new(format!("{env},{own}"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .try_init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("收到退出信号，准备关闭服务...");
}
