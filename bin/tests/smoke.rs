use std::time::{Duration, Instant};

use mesos_discover::config::cli::{Config, Parser};
use tokio::net::TcpListener;

async fn unreachable_zk() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("zk://{addr}/mesos")
}

fn config(args: &[&str]) -> Config {
    Config::try_parse_from(std::iter::once("mesos-discover").chain(args.iter().copied())).unwrap()
}

#[tokio::test]
async fn unreachable_ensemble_prints_nothing() {
    let zk = unreachable_zk().await;
    let config = config(&["--zk", &zk, "--timeout", "1"]);

    let mut out = Vec::new();
    let started = Instant::now();
    let err = mesos_discover::run(&config, &mut out).await.unwrap_err();

    assert!(out.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(format!("{err:#}").contains("could not find any Mesos master"));
}

#[tokio::test]
async fn all_mode_against_unreachable_ensemble_prints_nothing() {
    let zk = unreachable_zk().await;
    let config = config(&["--zk", &zk, "--timeout", "1", "-a"]);

    let mut out = Vec::new();
    assert!(mesos_discover::run(&config, &mut out).await.is_err());
    assert!(out.is_empty());
}

#[tokio::test]
async fn invalid_settings_fail_before_connecting() {
    let config = config(&["--zk", "zk://user:secret@localhost:2181", "--mesos-version", "x.y"]);

    let mut out = Vec::new();
    let err = mesos_discover::run(&config, &mut out).await.unwrap_err();
    assert!(out.is_empty());
    assert!(format!("{err:#}").contains("invalid discovery settings"));
}
