fn main() {
    // Propagate ESP-IDF build environment (no-op on host targets).
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
