use gate_core::{AsyncGatedInvoker, GateConfig, GatedInvoker, InvocationResult};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn fresh(id: usize) -> Result<InvocationResult<usize>, Infallible> {
    Ok(InvocationResult::fresh(id))
}

fn cached(id: usize) -> Result<InvocationResult<usize>, Infallible> {
    Ok(InvocationResult::cached(id))
}

fn hammer<F>(gate: Arc<GatedInvoker<F>>, threads: usize) -> (usize, usize)
where
    F: Fn(usize) -> Result<InvocationResult<usize>, Infallible> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads));
    let ok = Arc::new(AtomicUsize::new(0));
    let limited = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..threads)
        .map(|id| {
            let gate = gate.clone();
            let barrier = barrier.clone();
            let ok = ok.clone();
            let limited = limited.clone();
            thread::spawn(move || {
                barrier.wait();
                match gate.invoke(id) {
                    Ok(Some(got)) => {
                        assert_eq!(got, id);
                        ok.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(None) => panic!("raising gate returned nothing"),
                    Err(err) => {
                        assert!(err.is_rate_limited());
                        limited.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    (ok.load(Ordering::SeqCst), limited.load(Ordering::SeqCst))
}

#[test]
fn concurrent_fresh_calls_admit_exactly_max() {
    let config = GateConfig::new(5, Duration::from_secs(60)).unwrap();
    let gate = Arc::new(GatedInvoker::new(config, fresh));
    let (ok, limited) = hammer(gate.clone(), 32);
    assert_eq!(ok, 5);
    assert_eq!(limited, 27);
    assert_eq!(gate.snapshot().call_count, 32);
}

#[test]
fn fewer_threads_than_max_all_pass() {
    let config = GateConfig::new(10, Duration::from_secs(60)).unwrap();
    let gate = Arc::new(GatedInvoker::new(config, fresh));
    assert_eq!(hammer(gate, 7), (7, 0));
}

#[test]
fn concurrent_cache_hits_are_free() {
    let config = GateConfig::new(1, Duration::from_secs(60)).unwrap();
    let gate = Arc::new(GatedInvoker::new(config, cached));
    assert_eq!(hammer(gate.clone(), 24), (24, 0));
    assert_eq!(gate.snapshot().call_count, 0);
}

async fn fresh_async(id: usize) -> Result<InvocationResult<usize>, Infallible> {
    tokio::task::yield_now().await;
    Ok(InvocationResult::fresh(id))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_async_tasks_admit_exactly_max() {
    let config = GateConfig::new(5, Duration::from_secs(60)).unwrap();
    let gate = Arc::new(AsyncGatedInvoker::new(config, fresh_async));
    let barrier = Arc::new(tokio::sync::Barrier::new(40));

    let handles: Vec<_> = (0..40)
        .map(|id| {
            let gate = gate.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                gate.invoke(id).await
            })
        })
        .collect();

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(Some(_)) => ok += 1,
            Ok(None) => panic!("raising gate returned nothing"),
            Err(err) => {
                assert!(err.is_rate_limited());
                limited += 1;
            }
        }
    }
    assert_eq!((ok, limited), (5, 35));
    assert_eq!(gate.snapshot().await.call_count, 40);
}
