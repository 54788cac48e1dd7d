//! End-to-end client/server scenarios over a real POSIX shared-memory
//! channel: one process maps both roles onto separate threads, since a
//! genuine two-process run is what `cleanup-ipc` and the unit tests already
//! exercise piecemeal. Each scenario here is one of the literal cases named
//! in the design (add, divide-by-zero, unknown method, stateful
//! accumulator).

use shm_rpc_bridge::error::RpcError;
use shm_rpc_bridge::value::Value;
use shm_rpc_bridge::{ChannelConfig, RpcClient, RpcServer};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

fn unique_channel(label: &str) -> String {
    format!("shm_rpc_bridge_itest_{}_{}", label, Uuid::new_v4().simple())
}

fn test_config() -> ChannelConfig {
    ChannelConfig {
        buffer_size: 4096,
        timeout: Some(Duration::from_secs(2)),
    }
}

fn params(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
}

#[test]
fn add_returns_sum() {
    let channel = unique_channel("add");
    let mut server = RpcServer::create_with_config(&channel, &test_config()).unwrap();
    server.register("add", |p| {
        let a = p.require_i64("a")?;
        let b = p.require_i64("b")?;
        Ok(Value::Int(a + b))
    });

    let handle = thread::spawn(move || {
        server.handle_one().unwrap();
        server.close();
    });

    let client = RpcClient::connect_with_config(&channel, &test_config()).unwrap();
    let result = client
        .call("add", params(&[("a", Value::Int(5)), ("b", Value::Int(3))]))
        .unwrap();
    assert_eq!(result, Value::Int(8));

    handle.join().unwrap();
}

#[test]
fn divide_by_zero_fails_with_remote_method_message() {
    let channel = unique_channel("divide");
    let mut server = RpcServer::create_with_config(&channel, &test_config()).unwrap();
    server.register("divide", |p| {
        let a = p.require_f64("a")?;
        let b = p.require_f64("b")?;
        if b == 0.0 {
            return Err(RpcError::RemoteMethod("Division by zero".to_string()));
        }
        Ok(Value::Float(a / b))
    });

    let handle = thread::spawn(move || {
        server.handle_one().unwrap();
        server.close();
    });

    let client = RpcClient::connect_with_config(&channel, &test_config()).unwrap();
    let err = client
        .call("divide", params(&[("a", Value::Float(10.0)), ("b", Value::Float(0.0))]))
        .unwrap_err();
    match err {
        RpcError::RemoteMethod(message) => assert!(message.contains("Division by zero")),
        other => panic!("expected RemoteMethod, got {other:?}"),
    }

    handle.join().unwrap();
}

#[test]
fn unknown_method_fails_with_remote_method_message() {
    let channel = unique_channel("unknown_method");
    let server = RpcServer::create_with_config(&channel, &test_config()).unwrap();

    let handle = thread::spawn(move || {
        server.handle_one().unwrap();
        server.close();
    });

    let client = RpcClient::connect_with_config(&channel, &test_config()).unwrap();
    let err = client.call_no_args("nope").unwrap_err();
    match err {
        RpcError::RemoteMethod(message) => assert!(message.contains("Unknown method")),
        other => panic!("expected RemoteMethod, got {other:?}"),
    }

    handle.join().unwrap();
}

#[test]
fn stateful_accumulator_tracks_per_key_totals_across_calls() {
    let channel = unique_channel("accumulator");
    let mut server = RpcServer::create_with_config(&channel, &test_config()).unwrap();

    let totals: Arc<Mutex<BTreeMap<String, f64>>> = Arc::new(Mutex::new(BTreeMap::new()));

    let accumulate_totals = Arc::clone(&totals);
    server.register("accumulate", move |p| {
        let key = p.require_str("key")?.to_string();
        let amount = p.require_f64("amount")?;
        let mut guard = accumulate_totals.lock().unwrap();
        let entry = guard.entry(key).or_insert(0.0);
        *entry += amount;
        Ok(Value::Float(*entry))
    });

    let clear_totals = Arc::clone(&totals);
    server.register("clear", move |p| {
        let key = p.require_str("key")?.to_string();
        clear_totals.lock().unwrap().remove(&key);
        Ok(Value::Null)
    });

    let handle = thread::spawn(move || {
        for _ in 0..6 {
            server.handle_one().unwrap();
        }
        server.close();
    });

    let client = RpcClient::connect_with_config(&channel, &test_config()).unwrap();
    let accumulate = |key: &str, amount: f64| {
        client
            .call("accumulate", params(&[("key", Value::String(key.to_string())), ("amount", Value::Float(amount))]))
            .unwrap()
    };
    let clear = |key: &str| {
        client.call("clear", params(&[("key", Value::String(key.to_string()))])).unwrap()
    };

    assert_eq!(accumulate("alice", 10.0), Value::Float(10.0));
    assert_eq!(accumulate("bob", 7.5), Value::Float(7.5));
    assert_eq!(accumulate("alice", 5.0), Value::Float(15.0));
    clear("alice");
    assert_eq!(accumulate("alice", 1.25), Value::Float(1.25));
    assert_eq!(accumulate("bob", 1.0), Value::Float(8.5));

    handle.join().unwrap();
}
