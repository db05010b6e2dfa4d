//! End-to-end tests of the timer server and lightweight timers.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::time::Duration;

use proclet_rt::{Env, Pid, Received, TimerServer};

#[derive(Debug, Clone, PartialEq)]
struct Tick;

#[derive(Debug, Clone, PartialEq)]
struct GetCount;

/// A process that counts `Tick` casts and serves the count.
fn spawn_counter(env: &Env) -> Pid {
    env.spawn(|p| {
        Box::pin(async move {
            let mut count: u32 = 0;
            loop {
                match p.recv().await? {
                    Received::Cast(msg) if msg.is::<Tick>() => count += 1,
                    Received::Call { mut reply, .. } => {
                        reply.reply(count);
                    }
                    _ => {}
                }
            }
        })
    })
    .unwrap()
}

async fn count_of(pid: &Pid) -> u32 {
    *pid.call(GetCount).await.unwrap().downcast::<u32>().unwrap()
}

#[tokio::test]
async fn test_timer_server_is_spawn_or_locate() {
    let env = Env::new();
    let a = TimerServer::start(&env).await.unwrap();
    let b = TimerServer::start(&env).await.unwrap();

    assert_eq!(a.pid(), b.pid());
    assert_eq!(env.whereis(TimerServer::NAME).unwrap(), *a.pid());
}

#[tokio::test]
async fn test_send_after_delivers_once() {
    let env = Env::new();
    let timers = TimerServer::start(&env).await.unwrap();
    let counter = spawn_counter(&env);

    timers.send_after(20, &counter, Tick).await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(count_of(&counter).await, 0);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(count_of(&counter).await, 1);

    // no repeats
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(count_of(&counter).await, 1);
}

#[tokio::test]
async fn test_send_after_can_be_cancelled() {
    let env = Env::new();
    let timers = TimerServer::start(&env).await.unwrap();
    let counter = spawn_counter(&env);

    let timer = timers.send_after(40, &counter, Tick).await.unwrap();
    timers.cancel(timer).await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(count_of(&counter).await, 0);
}

#[tokio::test]
async fn test_interval_ticks_until_cancelled() {
    let env = Env::new();
    let timers = TimerServer::start(&env).await.unwrap();
    let counter = spawn_counter(&env);

    // at least 3 ticks at 30ms inside a generous window
    let interval = timers.send_interval(30, &counter, Tick).await.unwrap();
    tokio::time::sleep(Duration::from_millis(160)).await;
    let before_cancel = count_of(&counter).await;
    assert!(before_cancel >= 3, "got {before_cancel} ticks");

    timers.cancel(interval).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_cancel = count_of(&counter).await;

    // one delivery may have been in flight with the cancel
    assert!(after_cancel <= before_cancel + 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count_of(&counter).await, after_cancel);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let env = Env::new();
    let timers = TimerServer::start(&env).await.unwrap();
    let counter = spawn_counter(&env);

    let timer = timers.send_after(30, &counter, Tick).await.unwrap();
    timers.cancel(timer).await.unwrap();
    timers.cancel(timer).await.unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(count_of(&counter).await, 0);
}

#[tokio::test]
async fn test_zero_delay_is_rejected() {
    let env = Env::new();
    let timers = TimerServer::start(&env).await.unwrap();
    let counter = spawn_counter(&env);

    assert!(timers.send_after(0, &counter, Tick).await.is_err());
    assert!(timers.send_interval(0, &counter, Tick).await.is_err());
}

#[tokio::test]
async fn test_target_death_purges_intervals() {
    let env = Env::new();
    let timers = TimerServer::start(&env).await.unwrap();
    let counter = spawn_counter(&env);

    timers.send_interval(20, &counter, Tick).await.unwrap();
    tokio::time::sleep(Duration::from_millis(70)).await;

    counter.stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(70)).await;

    // the timer server survives its target and keeps serving
    assert!(timers.pid().is_alive());
    let fresh = spawn_counter(&env);
    timers.send_after(10, &fresh, Tick).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(count_of(&fresh).await, 1);
}

#[tokio::test]
async fn test_refs_from_the_timer_server_are_unique() {
    let env = Env::new();
    let timers = TimerServer::start(&env).await.unwrap();
    let counter = spawn_counter(&env);

    let a = timers.send_after(50, &counter, Tick).await.unwrap();
    let b = timers.send_after(50, &counter, Tick).await.unwrap();
    assert_ne!(a, b);
    assert!(b > a);
}

#[tokio::test]
async fn test_lightweight_send_after() {
    let env = Env::new();
    let counter = spawn_counter(&env);

    let timer = counter.send_after(Tick, 20);
    let cancelled = counter.send_after(Tick, 30);
    cancelled.stop();
    let _ = timer;

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(count_of(&counter).await, 1);
}
