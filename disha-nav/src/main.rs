//! DishaNav - Navigation session walkthrough
//!
//! Wires the orchestrator to an in-process beacon broker, a mini-program
//! page on the same session, a scripted routing engine and a logging
//! renderer, then replays one navigation: locate, pick a destination,
//! navigate, arrive.
//!
//! Usage:
//!   disha-nav --map cartogram-collection.json
//!   disha-nav --url "https://indoorgo.example.com/?session=abc123"
//!
//! Enable debug logging to see every renderer command:
//!   RUST_LOG=disha_nav=debug disha-nav

use clap::Parser;
use disha_nav::bridge::TelemetryBridge;
use disha_nav::config::DishaConfig;
use disha_nav::error::{NavError, Result};
use disha_nav::geometry::{feature_position, haversine_m};
use disha_nav::map_data::load_map_file;
use disha_nav::mock::{NearestBeaconFusion, ScriptedEngine};
use disha_nav::types::{CartogramCollection, Feature, Floor, Geometry, Position};
use disha_nav::view::LogRenderer;
use disha_nav::{Event, EventQueue, Intent, Orchestrator};
use sanket_io::beacon::{BeaconBatch, BeaconReading};
use sanket_io::broker::Broker;
use sanket_io::config::AppConfig;
use sanket_io::mock::MockScanner;
use sanket_io::page::{LogNotifier, MiniProgramPage};
use sanket_io::scanner::ScannerEvent;
use sanket_io::session::SessionToken;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::filter::Directive;
use url::Url;

/// Beacon major used for the walkthrough anchors
const ANCHOR_MAJOR: u16 = 10;

/// Steps walked between start and destination
const WALK_STEPS: usize = 12;

/// Navigation session walkthrough
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (default: disha.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cartogram collection JSON; overrides `map.data_path`
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Navigation page URL carrying the `session` parameter
    #[arg(short, long)]
    url: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "disha_nav=info"
                    .parse::<Directive>()
                    .map_err(|e| NavError::Config(format!("Bad log directive: {}", e)))?,
            ),
        )
        .init();

    let args = Args::parse();
    info!("DishaNav v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref())?;
    let map = load_map(args.map.as_deref(), &config)?;

    // Mini-program half: page on the shared session
    let broker = Broker::new();
    let mut page_config = AppConfig::default();
    page_config.broker.base_uri = config.telemetry.broker_base_uri.clone();
    let mut page = match &args.url {
        Some(raw) => {
            let session = SessionToken::from_url(&Url::parse(raw)?)?;
            MiniProgramPage::activate_with_session(page_config, &broker, session, MockScanner::new(), LogNotifier)?
        }
        None => MiniProgramPage::activate(page_config, &broker, MockScanner::new(), LogNotifier)?,
    };
    info!("Navigation page: {}", page.web_app_uri());

    // Web half: pull the session named in the page URL
    let anchors = anchor_features(&map);
    let mut fusion = NearestBeaconFusion::new();
    for (minor, feature) in (1u16..).zip(&anchors) {
        if let Some(position) = feature_position(feature) {
            fusion.add_anchor(ANCHOR_MAJOR, minor, position);
        }
    }
    let page_url = page.web_app_uri().clone();
    let mut bridge = TelemetryBridge::connect(&broker, &page_url, fusion)?;
    info!("Fusion anchors: {}", bridge.fusion().anchor_count());

    let queue = EventQueue::new();
    let engine = ScriptedEngine::with_events(queue.sender());
    engine.set_auto_progress(true);
    let arrival_threshold = config.navigation.arrival_threshold;
    let mut orchestrator = Orchestrator::new(config.navigation, map, LogRenderer, engine)?;

    let (Some(origin), Some(destination)) = (anchors.first(), anchors.last()) else {
        warn!("Map has no features to navigate between");
        return Ok(());
    };
    if origin.id == destination.id {
        warn!("Map has a single feature, nothing to navigate to");
        return Ok(());
    }

    // 1. Scanner sees the beacon at the origin
    page.on_show()?;
    let batch = BeaconBatch::new(0, vec![BeaconReading::new("F0F0C1C1", ANCHOR_MAJOR, 1, -58)]);
    page.handle_scanner_event(ScannerEvent::Beacon(batch), Instant::now());
    bridge.pump(&queue.sender());
    queue.run_until_idle(&mut orchestrator);
    if let Some(here) = orchestrator.latest_position() {
        info!("Located on {} at ({:.6}, {:.6})", here.floor_id, here.lng, here.lat);
    }
    queue.push(Event::Intent(Intent::LocateMyself));

    // 2. Pick and confirm the destination, then start
    info!("Destination: {}", destination.name().unwrap_or(&destination.id));
    queue.push(Event::Intent(Intent::SearchSelect(destination.clone())));
    queue.push(Event::Intent(Intent::Confirm));
    queue.push(Event::Intent(Intent::StartNavigation));
    queue.run_until_idle(&mut orchestrator);

    let Some(task) = orchestrator.task() else {
        warn!("Navigation did not start");
        return Ok(());
    };
    let (start, finish) = (task.start().clone(), task.finish().clone());
    info!("Task {} {}", task.id(), task.status().as_str());

    // 3. Walk towards the destination
    for step in 1..=WALK_STEPS {
        let t = step as f64 / WALK_STEPS as f64;
        let floor = if t < 0.5 { &start.floor_id } else { &finish.floor_id };
        let position = Position::new(
            start.lng + (finish.lng - start.lng) * t,
            start.lat + (finish.lat - start.lat) * t,
            floor.clone(),
        );
        let remaining = haversine_m(position.lng_lat(), finish.lng_lat());
        info!("Step {:>2}: {:.1} m to go", step, remaining);

        queue.push(Event::Location(position));
        queue.run_until_idle(&mut orchestrator);
        if remaining < arrival_threshold {
            break;
        }
    }

    // 4. "End navigation" from the arrival notice
    queue.push(Event::Intent(Intent::EndNavigationFromNotice));
    queue.run_until_idle(&mut orchestrator);
    if let Some((task, reason)) = orchestrator.last_stop() {
        info!("Task {} ended: {:?}", task, reason);
    }

    if let Some(location) = orchestrator.shared_location() {
        page.on_page_message(&[location]);
    }
    info!("Share: {}", page.share().path);

    page.on_hide()?;
    page.on_unload();
    info!("DishaNav finished");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DishaConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            DishaConfig::load(path)
        }
        None if Path::new("disha.toml").exists() => {
            info!("Loading configuration from disha.toml");
            DishaConfig::load(Path::new("disha.toml"))
        }
        None => {
            info!("Using default configuration");
            Ok(DishaConfig::default())
        }
    }
}

fn load_map(path: Option<&Path>, config: &DishaConfig) -> Result<CartogramCollection> {
    if let Some(path) = path {
        return load_map_file(path);
    }
    let configured = Path::new(&config.map.data_path);
    if configured.exists() {
        return load_map_file(configured);
    }
    info!("No map data at {:?}, using the built-in demo venue", configured);
    Ok(demo_map())
}

/// One feature per floor, default floor first.
fn anchor_features(map: &CartogramCollection) -> Vec<Feature> {
    let default_id = map.default_floor().map(|f| f.id.clone());
    let mut floors: Vec<&Floor> = map.floors.iter().collect();
    floors.sort_by_key(|f| Some(&f.id) != default_id.as_ref());
    floors
        .into_iter()
        .filter_map(|f| f.features.first().cloned())
        .collect()
}

/// Two-floor venue with one room per floor.
fn demo_map() -> CartogramCollection {
    let room = |id: &str, name: &str, floor: &str, lng: f64, lat: f64| {
        let d = 0.00008;
        let mut feature = Feature::new(
            id,
            Geometry::Polygon(vec![vec![
                [lng, lat],
                [lng + d, lat],
                [lng + d, lat + d],
                [lng, lat + d],
                [lng, lat],
            ]]),
        );
        feature.set_floor(floor);
        feature
            .properties
            .insert("name".into(), serde_json::Value::String(name.into()));
        feature
    };
    CartogramCollection {
        version: "2.0.0".into(),
        floors: vec![
            Floor {
                id: "F1".into(),
                name: "1F".into(),
                features: vec![room("f1-lobby", "Lobby", "F1", 113.3240, 23.1060)],
            },
            Floor {
                id: "F2".into(),
                name: "2F".into(),
                features: vec![room("f2-cafe", "Cafe", "F2", 113.3243, 23.1062)],
            },
        ],
    }
}
