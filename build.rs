fn main() {
    for var in [
        "VTMS_NODE_VARIANT",
        "VTMS_NODE_CONFIG",
        "VTMS_WIFI_SSID",
        "VTMS_WIFI_PASS",
        "VTMS_BROKER_HOST",
        "VTMS_BROKER_PORT",
        "VTMS_BROKER_USER",
        "VTMS_BROKER_PASS",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
