//! The process-wide runtime slot. Kept in its own test binary, since the
//! slot can only be filled once per process.

use ember_bridge::{runtime, SparkBridge};
use ember_local::LocalRuntime;
use ember_sdk::BridgeError;

#[test]
fn test_runtime_installs_exactly_once() {
    assert!(!runtime::is_installed());
    assert!(matches!(runtime::installed(), Err(BridgeError::NotInstalled)));

    runtime::install(Box::new(LocalRuntime::new())).unwrap();
    assert!(runtime::is_installed());

    let second = runtime::install(Box::new(LocalRuntime::new()));
    assert_eq!(second, Err(BridgeError::AlreadyInstalled));

    let installed = runtime::installed().unwrap();
    assert_eq!(installed.name(), "local");

    // the installed runtime drives a bridge like any other
    let bridge = SparkBridge::new(installed);
    let conf = bridge.build_configuration("global").unwrap();
    let context = bridge.build_context(conf).unwrap();
    let rdd = bridge.parallelize(context, &[9, 8, 7]).unwrap();
    assert_eq!(bridge.collect(rdd).unwrap(), vec![9, 8, 7]);
}
