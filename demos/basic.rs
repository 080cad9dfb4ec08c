use resilient_call::{BreakerError, CircuitBreaker, ResilientInvoker};
use std::error::Error;
use std::fmt;
use std::thread;
use std::time::Duration;

// Custom error type that implements Error trait
#[derive(Debug)]
struct ServiceError(String);

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service error: {}", self.0)
    }
}

impl Error for ServiceError {}

fn main() {
    // Create a circuit breaker with a small window so the demo trips quickly
    let breaker = CircuitBreaker::builder()
        .window_size(6)
        .minimum_calls(6)
        .failure_rate_threshold(50.0) // 50% failure rate will trip the circuit
        .wait_duration_in_open(Duration::from_secs(3))
        .permitted_calls_in_half_open(2)
        .build()
        .expect("valid configuration");

    // Wrap it in an invoker; whenever the call fails or is rejected the
    // caller still gets a usable answer
    let invoker = ResilientInvoker::new(breaker, |cause: &BreakerError<ServiceError>| {
        Ok(format!("fallback ({})", cause))
    });

    println!(
        "Circuit initial state: {}",
        invoker.breaker().current_state()
    );

    // Create a mutable counter for tracking failures
    let mut call_count = 0;

    let call_service = |counter: &mut u32| -> Result<String, ServiceError> {
        *counter += 1;
        if *counter <= 8 && *counter % 2 == 0 {
            // Simulate an error on even counts for a while
            Err(ServiceError("External service error".to_string()))
        } else {
            Ok("Success".to_string())
        }
    };

    // Make 15 calls through the invoker
    for i in 1..=15 {
        println!("\nAttempt {}:", i);

        match invoker.execute(|| call_service(&mut call_count)) {
            Ok(result) => println!("Result: {}", result),
            Err(err) => println!("Fatal error (fallback failed): {}", err),
        }

        let snapshot = invoker.breaker().metrics();
        println!(
            "Current state: {}, failure rate: {:.2}%",
            invoker.breaker().current_state(),
            snapshot.failure_rate
        );

        // Add a small delay between calls
        thread::sleep(Duration::from_millis(300));
    }
}
