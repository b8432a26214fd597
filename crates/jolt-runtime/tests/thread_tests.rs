//! Calls from many threads share one runtime

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use jolt_runtime::{JavaObject, Value};

#[test]
fn test_calls_from_spawned_threads() {
    let Some(jvm) = common::runtime() else { return };
    let math = jvm.find_class("java.lang.Math").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let math = math.clone();
            thread::spawn(move || {
                let mut total = 0i64;
                for j in 0..200 {
                    let value = math.invoke("abs", &[Value::Int(-(i * 1_000 + j))]).unwrap();
                    total += i64::from(value.extract::<i32>().unwrap());
                }
                total
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let i = i as i64;
        let expected: i64 = (0..200).map(|j| i * 1_000 + j).sum();
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_shared_object_across_threads() {
    let Some(jvm) = common::runtime() else { return };
    let counter = jvm
        .find_class("java.util.concurrent.atomic.AtomicLong")
        .unwrap()
        .new_instance(&[])
        .unwrap();
    let counter = Arc::new(counter);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let counter = Arc::clone(&counter);
            let jvm = jvm.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    counter.invoke("incrementAndGet", &[]).unwrap();
                }
                jvm.detach_current_thread().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(counter.invoke("get", &[]).unwrap(), Value::Long(1_000));
}

#[test]
fn test_proxy_dropped_on_another_thread() {
    let Some(jvm) = common::runtime() else { return };
    let text = jvm.new_string("moved").unwrap();
    let echoed = thread::spawn(move || -> String { text.java_to_string().unwrap() })
        .join()
        .unwrap();
    assert_eq!(echoed, "moved");

    let objects: Vec<JavaObject> = (0..50).map(|i| jvm.new_string(&i.to_string()).unwrap()).collect();
    thread::spawn(move || drop(objects)).join().unwrap();
    assert!(jvm.new_string("still alive").is_ok());
}

#[test]
fn test_detach_leaves_other_threads_attached() {
    let Some(jvm) = common::runtime() else { return };
    let attached = Arc::new(Barrier::new(2));
    let detached = Arc::new(Barrier::new(2));

    let worker = {
        let jvm = jvm.clone();
        let attached = Arc::clone(&attached);
        let detached = Arc::clone(&detached);
        thread::spawn(move || {
            let builder = jvm
                .find_class("java.lang.StringBuilder")
                .unwrap()
                .new_instance(&[Value::from("worker")])
                .unwrap();
            attached.wait();
            detached.wait();
            builder.invoke("append", &[Value::Int(1)]).unwrap();
            builder.java_to_string().unwrap()
        })
    };

    attached.wait();
    jvm.detach_current_thread().unwrap();
    let math = jvm.find_class("java.lang.Math").unwrap();
    assert_eq!(math.invoke("abs", &[Value::Int(-9)]).unwrap(), Value::Int(9));
    detached.wait();

    assert_eq!(worker.join().unwrap(), "worker1");
}
