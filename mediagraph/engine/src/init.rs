/*!
    Process-wide engine initialization.
*/

use parking_lot::Mutex;

static REFCOUNT: Mutex<u32> = Mutex::new(0);

/**
    Initialize the engine for this process.

    Reference counted: the first call performs the one-time initialization,
    later calls only increment the count. Must be called before any
    controller is constructed; adapters rely on it having happened and never
    re-initialize per instance.
*/
pub fn init() {
    let mut count = REFCOUNT.lock();
    if *count == 0 {
        log::debug!("media graph engine initialized");
    }
    *count += 1;
}

/**
    Release one reference to the engine.

    The last release tears down the process-wide state.
*/
pub fn shutdown() {
    let mut count = REFCOUNT.lock();
    match *count {
        0 => log::warn!("engine shutdown without matching init"),
        1 => {
            *count = 0;
            log::debug!("media graph engine shut down");
        }
        _ => *count -= 1,
    }
}

/**
    Returns true if the engine is currently initialized.
*/
pub fn is_initialized() -> bool {
    *REFCOUNT.lock() > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // These share one process-global counter, so exercise the whole
    // sequence in a single test.
    #[test]
    fn init_and_shutdown_are_refcounted() {
        assert!(!is_initialized());

        init();
        assert!(is_initialized());

        init();
        shutdown();
        assert!(is_initialized());

        shutdown();
        assert!(!is_initialized());

        // Unbalanced shutdown must not underflow.
        shutdown();
        assert!(!is_initialized());
    }
}
