//! Integration test: forwarding-percentage rows flow from the strategy
//! through the bounded channel into the trace file.

use pcon_core::name::Name;
use pcon_core::packet::{Data, Interest};
use pcon_core::tag::{CongestionTag, NackType};
use pcon_forwarder::config::{ForwarderConfig, StrategyConfig};
use pcon_forwarder::face::Face;
use pcon_forwarder::forwarder::Forwarder;
use pcon_forwarder::trace;
use quanta::Clock;
use std::time::Duration;

#[test]
fn weight_changes_land_in_the_trace_file() {
    let (clock, mock) = Clock::mock();
    let path = std::env::temp_dir().join(format!("fwperc-e2e-{}.txt", std::process::id()));
    let (handle, join) = trace::spawn(&path, clock.now()).unwrap();

    let config = ForwarderConfig {
        node_id: 7,
        strategy: StrategyConfig {
            init_shortest_path: false,
            change_per_mark: 0.2,
            ..StrategyConfig::default()
        },
        ..ForwarderConfig::default()
    };
    let mut fwd = Forwarder::with_seed(config, 3);
    fwd.set_trace(handle.clone());
    fwd.add_face(Face::new(1, "appface://consumer", 0, true));
    fwd.add_face(Face::new(2, "netdev://eth0", 1, false));
    fwd.add_face(Face::new(3, "netdev://eth1", 1, false));
    fwd.add_route(Name::from_uri("/app"), 2);
    fwd.add_route(Name::from_uri("/app"), 3);

    mock.increment(Duration::from_secs(1));
    let name = Name::from_uri("/app").with_sequence(0);
    fwd.on_interest(1, Interest::new(name.clone(), 1), clock.now());
    let marked = Data::new(name).with_tag(CongestionTag::new(NackType::None, 1, false, false));
    fwd.on_data(2, marked, clock.now());

    drop(fwd);
    drop(handle);
    join.join().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("Time\tNode\tPrefix\tFaceId\ttype\tvalue"));

    let rows: Vec<Vec<&str>> = lines.map(|l| l.split('\t').collect()).collect();
    assert!(!rows.is_empty(), "initialization and the update both emit rows");
    for row in &rows {
        assert_eq!(row.len(), 6);
        assert_eq!(row[1], "7", "node column");
        assert_eq!(row[2], "/app", "prefix column");
        assert_eq!(row[4], "forwperc", "type column");
    }
    // the last two rows carry the post-update split: 0.4 / 0.6
    let last_values: Vec<&str> = rows[rows.len() - 2..].iter().map(|r| r[5]).collect();
    assert!(last_values.contains(&"0.4"));
    assert!(last_values.contains(&"0.6"));

    std::fs::remove_file(&path).ok();
}
