//! `streambench` command-line entry point

mod cli;

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use streambench::bus::{make_bus, BusConfig, BusKind, Role, TcpBus};
use streambench::export;
use streambench::metrics::{render_metrics, start_metrics_server, MetricsConfig};
use streambench::stats::{StreamStats, Summary};
use streambench::stream::{
    bench_cases, run_bench, spawn_observer, Consumer, Producer, RunConfig, StreamError,
    StreamRunner,
};

use cli::{parse_seconds, BenchArgs, Cli, Command, OutputArgs, PublishArgs, RunArgs, SubscribeArgs};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Publish(args) => publish(args).await,
        Command::Subscribe(args) => subscribe(args).await,
        Command::Bench(args) => bench(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let configuration = e
                .downcast_ref::<StreamError>()
                .map(StreamError::is_configuration)
                .unwrap_or(false);
            if configuration {
                eprintln!("configuration error: {:#}", e);
            } else {
                eprintln!("error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn start_metrics(addr: Option<std::net::SocketAddr>) -> anyhow::Result<()> {
    if let Some(addr) = addr {
        start_metrics_server(MetricsConfig::with_addr(addr))?;
    }
    Ok(())
}

/// Log the final scrape so the last values survive the listener going away
fn dump_metrics() {
    if let Some(text) = render_metrics() {
        tracing::debug!("Final metrics:\n{}", text);
    }
}

fn print_summary(title: &str, summary: &Summary) {
    println!("\n{}", title);
    println!("{}", "-".repeat(28));
    for (name, value) in summary.fields() {
        println!("  {:<10} {:>14}", name, value.unwrap_or_else(|| "-".to_string()));
    }
}

fn write_outputs(output: &OutputArgs, stats: &StreamStats, summary: &Summary) -> anyhow::Result<()> {
    if let Some(path) = &output.csv {
        export::csv::write_summary(summary, path)?;
        tracing::info!("Wrote summary CSV to {}", path.display());
    }
    if let Some(path) = &output.prom {
        export::prometheus::write_summary(summary, path)?;
        tracing::info!("Wrote summary metrics to {}", path.display());
    }
    if let Some(path) = &output.json {
        export::json::write_summary(summary, path)?;
        tracing::info!("Wrote summary JSON to {}", path.display());
    }

    if output.hist_csv.is_some() || output.hist_prom.is_some() {
        let histogram = stats.default_histogram();
        if let Some(path) = &output.hist_csv {
            export::csv::write_histogram(&histogram, path)?;
            tracing::info!("Wrote histogram CSV to {}", path.display());
        }
        if let Some(path) = &output.hist_prom {
            export::prometheus::write_histogram(&histogram, path)?;
            tracing::info!("Wrote histogram metrics to {}", path.display());
        }
    }
    Ok(())
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    start_metrics(args.metrics_addr)?;

    let duration = parse_seconds(args.seconds)?;
    let impairment = args.impair.impairment()?;
    let mut producer = args.signal.producer_config(args.hz, duration);
    producer.seed = impairment.seed;

    let mut config = RunConfig::new(args.bus.bus_config(impairment), producer);
    config.live_interval = args.live_interval_ms.map(Duration::from_millis);

    let runner = StreamRunner::new(config);
    let outcome = runner.run().await?;

    print_summary("Run summary", &outcome.summary);
    dump_metrics();
    write_outputs(&args.output, &runner.stats(), &outcome.summary)
}

async fn publish(args: PublishArgs) -> anyhow::Result<()> {
    start_metrics(args.metrics_addr)?;

    let duration = parse_seconds(args.seconds)?;
    let mut config = args.signal.producer_config(args.hz, duration);
    config.seed = args.seed;

    let publisher = TcpBus::new(&args.endpoint, Role::Publisher, args.capacity)
        .await
        .map_err(StreamError::from)?;
    tracing::info!(
        "Publishing {} frames on {}",
        config.kind,
        publisher
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| args.endpoint.clone())
    );

    if args.wait_subscriber_ms > 0 {
        let wait = Duration::from_millis(args.wait_subscriber_ms);
        if !publisher.wait_for_subscribers(1, wait).await {
            tracing::warn!("No subscriber after {:?}, publishing anyway", wait);
        }
    }

    let stats = Arc::new(StreamStats::new());
    let report = Producer::new(Arc::new(publisher), stats.clone(), &config)?
        .run()
        .await?;

    tracing::info!(
        "Published {} of {} frames ({} dropped before send)",
        report.published,
        report.ticks,
        report.dropped
    );
    print_summary("Publisher summary", &stats.summary());
    dump_metrics();
    Ok(())
}

async fn subscribe(args: SubscribeArgs) -> anyhow::Result<()> {
    start_metrics(args.metrics_addr)?;

    let duration = parse_seconds(args.seconds)?;
    let config = BusConfig {
        kind: BusKind::Tcp,
        endpoint: args.endpoint.clone(),
        capacity: args.capacity,
        impairment: args.impair.impairment()?,
    };

    let bus = make_bus(&config, Role::Subscriber)
        .await
        .map_err(StreamError::from)
        .with_context(|| format!("subscribing to {}", args.endpoint))?;
    tracing::info!("Subscribed to {} for {:?}", args.endpoint, duration);

    let stats = Arc::new(StreamStats::new());
    let observer = args
        .live_interval_ms
        .map(|ms| spawn_observer(stats.clone(), Duration::from_millis(ms)));
    let received = Consumer::new(bus, stats.clone(), duration).run().await;
    if let Some(observer) = observer {
        observer.abort();
    }
    received?;

    let summary = stats.summary();
    print_summary("Subscriber summary", &summary);
    dump_metrics();
    write_outputs(&args.output, &stats, &summary)
}

async fn bench(args: BenchArgs) -> anyhow::Result<()> {
    let duration = parse_seconds(args.seconds)?;
    let impairment = args.impair.impairment()?;

    let mut base = RunConfig::new(args.bus.bus_config(impairment), Default::default());
    base.producer.duration = duration;
    base.producer.quality = args.quality;
    base.producer.width = args.width;
    base.producer.height = args.height;
    base.producer.seed = base.bus.impairment.seed;

    let cases = bench_cases(&args.rates);
    let results = run_bench(&base, &cases).await?;

    for result in &results {
        println!(
            "{:>4} {:>7} {:>5}Hz  tx={:<6} rx={:<6} loss={:>6}%  p50={:>8} fps={:>8}",
            result.case.kind.as_str(),
            result.case.codec.as_str(),
            result.case.rate_hz,
            result.summary.tx,
            result.summary.rx,
            result.summary.loss_pct,
            result
                .summary
                .lat_p50
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            result
                .summary
                .fps
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    export::csv::write_bench(&results, &args.out)?;
    tracing::info!("Wrote {} bench rows to {}", results.len(), args.out.display());
    Ok(())
}
