//! End-to-end tests of processes, links, monitors, and exit propagation.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::time::Duration;

use proclet_rt::message::Info;
use proclet_rt::{Env, ExitReason, Pid, Received, RtError};

#[derive(Debug, Clone, PartialEq)]
struct Req(u32);

#[derive(Debug, Clone, PartialEq)]
struct Reply(u32);

#[derive(Debug, Clone, PartialEq)]
struct Query;

/// A loop that echoes `Req(x)` as `Reply(x)`.
fn spawn_echo(env: &Env) -> Pid {
    env.spawn(|p| {
        Box::pin(async move {
            loop {
                if let Received::Call { req, mut reply } = p.recv().await? {
                    match req.downcast::<Req>() {
                        Ok(req) => {
                            reply.reply(Reply(req.0));
                        }
                        Err(_) => {
                            reply.reply_err(RtError::BadArg("unexpected request"));
                        }
                    }
                }
            }
        })
    })
    .unwrap()
}

/// A loop that only waits to be told to die.
fn spawn_idle(env: &Env) -> Pid {
    env.spawn(|p| {
        Box::pin(async move {
            loop {
                let _ = p.recv().await?;
            }
        })
    })
    .unwrap()
}

#[tokio::test]
async fn test_echo_call_and_clean_stop() {
    let env = Env::new();
    let pid = spawn_echo(&env);

    let reply = pid.call(Req(42)).await.unwrap();
    assert_eq!(reply.downcast_ref::<Reply>(), Some(&Reply(42)));

    pid.stop().await.unwrap();
    assert!(pid.alive().unwrap_err().is_no_proc());

    // messaging a dead process reports no_proc
    assert!(pid.send(Req(1)).unwrap_err().is_no_proc());
    assert!(pid.call(Req(1)).await.unwrap_err().is_no_proc());
}

#[tokio::test]
async fn test_stop_from_concurrent_callers() {
    let env = Env::new();
    let pid = spawn_idle(&env);

    let racer = {
        let pid = pid.clone();
        tokio::spawn(async move { pid.stop().await })
    };
    let mine = pid.stop().await;
    let theirs = racer.await.unwrap();

    // both observe the death; each call either succeeds or sees no_proc
    for outcome in [mine, theirs] {
        match outcome {
            Ok(()) => {}
            Err(err) => assert!(err.is_no_proc()),
        }
    }
    assert!(!pid.is_alive());
}

#[tokio::test]
async fn test_pid_uniqueness_and_display() {
    let env = Env::new();
    let a = spawn_idle(&env);
    let b = spawn_idle(&env);

    assert_ne!(a, b);
    assert_ne!(a.id(), b.id());
    assert_eq!(a.to_string(), format!("<0.{}.{}>", env.id(), a.id()));

    // user processes count up from 1; pid 0 is the registrar
    assert!(a.id() >= 1);
    assert!(b.id() > a.id());

    let other_env = Env::new();
    let c = spawn_idle(&other_env);
    assert_ne!(a, c); // env id is part of the identity
}

#[tokio::test]
async fn test_ref_uniqueness() {
    let env = Env::new();
    let mut last = env.make_ref();
    for _ in 0..100 {
        let next = env.make_ref();
        assert!(next > last);
        last = next;
    }
}

#[tokio::test]
async fn test_backpressure_on_user_mailbox() {
    let env = Env::new();
    // a process that never reads its mailbox
    let pid = env
        .spawn_opts(
            |p| {
                Box::pin(async move {
                    let _ = p.self_pid();
                    std::future::pending().await
                })
            },
            proclet_rt::SpawnOpts::new().with_usr_channel_size(3),
        )
        .unwrap();

    for i in 0..3 {
        pid.send(Req(i)).unwrap();
    }
    assert!(pid.send(Req(99)).unwrap_err().is_channel_full());
}

#[tokio::test]
async fn test_linked_pair_dies_together() {
    let env = Env::new();
    let p1 = spawn_idle(&env);
    let p2 = env
        .spawn_link(&p1, |p| {
            Box::pin(async move {
                loop {
                    let _ = p.recv().await?;
                }
            })
        })
        .unwrap();

    // let the link settle on both sides
    tokio::time::sleep(Duration::from_millis(10)).await;
    let links = p1.process_links().await.unwrap();
    assert_eq!(links, vec![p2.clone()]);
    let links_back = p2.process_links().await.unwrap();
    assert_eq!(links_back, vec![p1.clone()]);

    p1.exit_reason(&p2, ExitReason::Other("bad".into())).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!p1.is_alive());
    assert!(!p2.is_alive());
}

#[tokio::test]
async fn test_trap_exit_survives_peer_death() {
    let env = Env::new();

    // P1 traps exits, remembers the last one, and serves it on request
    let p1 = env
        .spawn(|p| {
            Box::pin(async move {
                p.context().set_trap_exit(true);
                let mut last_exit: Option<String> = None;
                loop {
                    match p.recv().await? {
                        Received::Info(Info::Exit { reason, .. }) => {
                            last_exit = Some(reason.to_string());
                        }
                        Received::Call { mut reply, .. } => {
                            reply.reply(last_exit.clone());
                        }
                        _ => {}
                    }
                }
            })
        })
        .unwrap();

    let p2 = env
        .spawn_opts(
            |p| {
                Box::pin(async move {
                    loop {
                        let _ = p.recv().await?;
                    }
                })
            },
            proclet_rt::SpawnOpts::new().with_link_to(p1.clone()),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    p1.exit_reason(&p2, ExitReason::Other("bad".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(p1.is_alive());
    assert!(!p2.is_alive());

    let last = p1.call(Query).await.unwrap();
    assert_eq!(
        last.downcast_ref::<Option<String>>(),
        Some(&Some("bad".to_owned()))
    );
}

#[tokio::test]
async fn test_unlinked_processes_are_unaffected() {
    let env = Env::new();
    let p1 = spawn_idle(&env);
    let p2 = spawn_idle(&env);

    p1.exit_reason(&p2, ExitReason::Other("bad".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(p1.is_alive()); // p1 only sent the signal
    assert!(!p2.is_alive());
}

#[tokio::test]
async fn test_kill_terminates_a_trapping_process() {
    let env = Env::new();
    let victim = env
        .spawn(|p| {
            Box::pin(async move {
                p.context().set_trap_exit(true);
                loop {
                    let _ = p.recv().await?;
                }
            })
        })
        .unwrap();
    let killer = spawn_idle(&env);

    killer.exit_reason(&victim, ExitReason::Kill).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!victim.is_alive());
}

#[tokio::test]
async fn test_monitor_observes_death_exactly_once() {
    let env = Env::new();
    let target = spawn_idle(&env);

    // observer monitors the target and serves the downs it has seen
    let observer = {
        let target = target.clone();
        env.spawn(move |p| {
            Box::pin(async move {
                let reference = p.context().monitor(&target).map_err(|_| {
                    ExitReason::Other("monitor failed".into())
                })?;
                let mut downs: Vec<(bool, String)> = Vec::new();
                loop {
                    match p.recv().await? {
                        Received::Info(Info::MonitorDown(down)) => {
                            downs.push((down.reference == reference, down.reason.to_string()));
                        }
                        Received::Call { mut reply, .. } => {
                            reply.reply(downs.clone());
                        }
                        _ => {}
                    }
                }
            })
        })
        .unwrap()
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    target.stop_reason(ExitReason::Other("bad".into())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let downs = observer.call(Query).await.unwrap();
    let downs = downs.downcast::<Vec<(bool, String)>>().unwrap();
    assert_eq!(*downs, vec![(true, "bad".to_owned())]);
}

#[tokio::test]
async fn test_monitor_on_dead_target_fires_no_proc() {
    let env = Env::new();
    let target = spawn_idle(&env);
    target.stop().await.unwrap();

    let observer = {
        let target = target.clone();
        env.spawn(move |p| {
            Box::pin(async move {
                let _ = p.context().monitor(&target);
                loop {
                    match p.recv().await? {
                        Received::Info(Info::MonitorDown(down)) => {
                            let _ = down;
                            // serve one query, then keep looping
                        }
                        Received::Call { mut reply, .. } => {
                            reply.reply(true);
                        }
                        _ => {}
                    }
                }
            })
        })
        .unwrap()
    };

    // the immediate no_proc down must not wedge the observer
    tokio::time::sleep(Duration::from_millis(20)).await;
    let alive = observer.call(Query).await.unwrap();
    assert_eq!(alive.downcast_ref::<bool>(), Some(&true));
}

#[tokio::test]
async fn test_weak_pid_nil_after_process_goes_away() {
    let env = Env::new();
    let pid = spawn_idle(&env);
    let weak = pid.downgrade();

    assert!(weak.upgrade().is_ok());

    pid.stop().await.unwrap();
    drop(pid);
    // the driver task has torn down; give its handle time to drop
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(weak.upgrade().unwrap_err().is_nil_pid());
}

#[tokio::test]
async fn test_self_exit_terminates_despite_trap() {
    let env = Env::new();
    let pid = env
        .spawn(|p| {
            Box::pin(async move {
                p.context().set_trap_exit(true);
                loop {
                    if let Received::Cast(_) = p.recv().await? {
                        p.self_pid().exit(ExitReason::Other("done".into()))
                            .map_err(|_| ExitReason::Other("exit send failed".into()))?;
                    }
                }
            })
        })
        .unwrap();

    pid.send(Req(0)).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!pid.is_alive());
}

#[tokio::test]
async fn test_panicking_process_propagates_panic_text() {
    let env = Env::new();
    let p1 = env
        .spawn(|p| {
            Box::pin(async move {
                p.context().set_trap_exit(true);
                let mut last_exit: Option<String> = None;
                loop {
                    match p.recv().await? {
                        Received::Info(Info::Exit { reason, .. }) => {
                            last_exit = Some(reason.to_string());
                        }
                        Received::Call { mut reply, .. } => {
                            reply.reply(last_exit.clone());
                        }
                        _ => {}
                    }
                }
            })
        })
        .unwrap();

    let p2 = env
        .spawn_opts(
            |p| {
                Box::pin(async move {
                    loop {
                        if let Received::Cast(_) = p.recv().await? {
                            panic!("worker exploded");
                        }
                    }
                })
            },
            proclet_rt::SpawnOpts::new().with_link_to(p1.clone()),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    p2.send(Req(0)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!p2.is_alive());
    let last = p1.call(Query).await.unwrap();
    assert_eq!(
        last.downcast_ref::<Option<String>>(),
        Some(&Some("worker exploded".to_owned()))
    );
}
