//! End-to-end behavior of the runtime: subjects, schedulers, disposables and
//! the notification grammar working together.

use std::{
  convert::Infallible,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier, Mutex,
  },
  thread,
};

use rxcore::{observer::ObserverAll, prelude::*};

type Log<T> = Arc<Mutex<Vec<Notification<T, &'static str>>>>;

fn recorder<T: Send + 'static>(
  log: &Log<T>,
) -> impl Observer<T, &'static str> + Send + 'static {
  let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
  ObserverAll {
    next: move |v: T| l1.lock().unwrap().push(Notification::Next(v)),
    error: move |e: &'static str| l2.lock().unwrap().push(Notification::Error(e)),
    complete: move || l3.lock().unwrap().push(Notification::Complete),
  }
}

/// Zero or more values, then at most one terminal, then nothing.
fn well_formed<T, E>(log: &[Notification<T, E>]) -> bool {
  match log.iter().position(Notification::is_terminal) {
    Some(at) => at == log.len() - 1,
    None => true,
  }
}

#[rxcore_macro::test]
fn plain_subject_multicast() {
  let subject = Subject::<i32, &'static str>::new();
  let (a, b) = (Log::default(), Log::default());
  subject.clone().subscribe_with(recorder(&a));
  subject.try_next(1).unwrap();
  subject.clone().subscribe_with(recorder(&b));
  subject.try_next(2).unwrap();
  subject.try_complete().unwrap();

  use Notification::*;
  assert_eq!(*a.lock().unwrap(), vec![Next(1), Next(2), Complete]);
  assert_eq!(*b.lock().unwrap(), vec![Next(2), Complete]);
}

#[rxcore_macro::test]
fn replay_subject_last_two() {
  let subject = ReplaySubject::<i32, &'static str>::new(ReplayConfig::new().max_count(2));
  for v in 1..=3 {
    subject.try_next(v).unwrap();
  }
  let a = Log::default();
  subject.clone().subscribe_with(recorder(&a));
  subject.try_next(4).unwrap();

  use Notification::*;
  assert_eq!(*a.lock().unwrap(), vec![Next(2), Next(3), Next(4)]);
}

#[rxcore_macro::test]
fn replay_subject_age_window_on_virtual_clock() {
  let clock = VirtualTimeScheduler::new();
  let subject = ReplaySubject::<&'static str, &'static str>::new(
    ReplayConfig::new().max_age(Duration::from_millis(100)).scheduler(clock.clone()),
  );
  subject.try_next("t0").unwrap();
  clock.advance_to(Duration::from_millis(50));
  subject.try_next("t50").unwrap();
  clock.advance_to(Duration::from_millis(120));
  subject.try_next("t120").unwrap();
  clock.advance_to(Duration::from_millis(150));

  // Window is (50, 150]: "t50" is exactly 100 old and gone.
  let late = Log::default();
  subject.clone().subscribe_with(recorder(&late));
  assert_eq!(*late.lock().unwrap(), vec![Notification::Next("t120")]);
}

#[rxcore_macro::test]
fn replay_subject_intersects_count_and_age() {
  let clock = VirtualTimeScheduler::new();
  let subject = ReplaySubject::<i32, &'static str>::new(
    ReplayConfig::new()
      .max_count(2)
      .max_age(Duration::from_millis(30))
      .scheduler(clock.clone()),
  );
  for v in 0..4 {
    subject.try_next(v).unwrap();
    clock.advance_by(Duration::from_millis(10));
  }
  // Last two are 2 (20 old) and 3 (10 old); both within 30.
  let first = Log::default();
  subject.clone().subscribe_with(recorder(&first));
  clock.advance_by(Duration::from_millis(10));
  // Now 2 is 30 old and evicted.
  let second = Log::default();
  subject.clone().subscribe_with(recorder(&second));

  use Notification::*;
  assert_eq!(*first.lock().unwrap(), vec![Next(2), Next(3)]);
  assert_eq!(*second.lock().unwrap(), vec![Next(3)]);
}

#[rxcore_macro::test]
fn behavior_subject_seed_first() {
  let subject = BehaviorSubject::<i32, &'static str>::new(42);
  let a = Log::default();
  subject.clone().subscribe_with(recorder(&a));
  subject.try_next(43).unwrap();
  use Notification::*;
  assert_eq!(*a.lock().unwrap(), vec![Next(42), Next(43)]);
}

#[rxcore_macro::test]
fn periodic_ten_ticks_in_a_thousand() {
  let scheduler = VirtualTimeScheduler::new();
  let sref = SchedulerRef::from(scheduler.clone());
  let ticks = Arc::new(Mutex::new(vec![]));
  let c_ticks = ticks.clone();
  let c_sref = sref.clone();
  let _periodic = sref.schedule_periodic(Duration::from_millis(100), move || {
    c_ticks.lock().unwrap().push(c_sref.now().as_millis());
  });
  scheduler.advance_by(Duration::from_millis(1000));
  assert_eq!(*ticks.lock().unwrap(), (1..=10).map(|n| n * 100).collect::<Vec<u128>>());
}

#[cfg(feature = "futures-scheduler")]
#[rxcore_macro::test]
fn periodic_never_overlaps_on_a_pool() {
  let running = Arc::new(AtomicUsize::new(0));
  let calls = Arc::new(AtomicUsize::new(0));
  let overlapped = Arc::new(AtomicUsize::new(0));
  let (c_running, c_calls, c_overlapped) = (running.clone(), calls.clone(), overlapped.clone());
  let sref = SchedulerRef::from(PoolScheduler::shared());
  let periodic = sref.schedule_periodic(Duration::from_millis(2), move || {
    if c_running.fetch_add(1, Ordering::SeqCst) != 0 {
      c_overlapped.fetch_add(1, Ordering::SeqCst);
    }
    thread::sleep(std::time::Duration::from_millis(5));
    c_running.fetch_sub(1, Ordering::SeqCst);
    c_calls.fetch_add(1, Ordering::SeqCst);
  });
  while calls.load(Ordering::SeqCst) < 5 {
    thread::sleep(std::time::Duration::from_millis(1));
  }
  periodic.unsubscribe();
  assert_eq!(overlapped.load(Ordering::SeqCst), 0);
}

#[rxcore_macro::test]
fn composite_disposed_twice_concurrently() {
  let composite = CompositeSubscription::new();
  let runs = Arc::new(AtomicUsize::new(0));
  for _ in 0..2 {
    let c_runs = runs.clone();
    composite.add(ClosureSubscription::new(move || {
      c_runs.fetch_add(1, Ordering::SeqCst);
    }));
  }
  let barrier = Arc::new(Barrier::new(2));
  let handles: Vec<_> = (0..2)
    .map(|_| {
      let (composite, barrier) = (composite.clone(), barrier.clone());
      thread::spawn(move || {
        barrier.wait();
        composite.unsubscribe();
      })
    })
    .collect();
  handles.into_iter().for_each(|h| h.join().unwrap());
  assert_eq!(runs.load(Ordering::SeqCst), 2);
  assert!(composite.is_closed());
}

#[rxcore_macro::test]
fn single_assignment_and_ref_count_contracts() {
  let slot = SingleAssignmentSubscription::new();
  slot.unsubscribe();
  let late = CancellationFlag::new();
  slot.assign(late.clone()).unwrap();
  assert!(late.is_cancelled());

  let slot = SingleAssignmentSubscription::new();
  slot.assign(CancellationFlag::new()).unwrap();
  assert!(matches!(slot.assign(CancellationFlag::new()), Err(RxError::InvalidOperation(_))));

  let resource = CancellationFlag::new();
  let rc = RefCountSubscription::new(resource.clone());
  let handle = rc.acquire();
  handle.unsubscribe();
  assert!(!resource.is_cancelled());
  rc.unsubscribe();
  assert!(resource.is_cancelled());
}

#[rxcore_macro::test]
fn notification_grammar_holds_under_racing_producers() {
  let subject = Subject::<usize, &'static str>::new();
  let log: Log<usize> = Log::default();
  subject.clone().take(50).subscribe_with(recorder(&log));

  let handles: Vec<_> = (0..4)
    .map(|n| {
      let subject = subject.clone();
      thread::spawn(move || {
        for v in 0..100 {
          let _ = subject.try_next(n * 100 + v);
        }
        let _ = subject.try_complete();
      })
    })
    .collect();
  handles.into_iter().for_each(|h| h.join().unwrap());

  let log = log.lock().unwrap();
  assert!(well_formed(&log));
  assert_eq!(log.len(), 51);
  assert_eq!(log.last(), Some(&Notification::Complete));
}

#[rxcore_macro::test]
fn chain_with_failing_selector_disposes_upstream() {
  let subject = Subject::<i32, String>::new();
  let log = Arc::new(Mutex::new(vec![]));
  let (l1, l2) = (log.clone(), log.clone());
  subject
    .clone()
    .try_map(|v| if v < 3 { Ok(v) } else { Err(format!("{v} is too big")) })
    .scan(0, |acc, v| acc + v)
    .subscribe_err(
      move |v| l1.lock().unwrap().push(v.to_string()),
      move |e| l2.lock().unwrap().push(e),
    );
  for v in 1..=4 {
    let _ = subject.try_next(v);
  }
  assert_eq!(*log.lock().unwrap(), vec!["1", "3", "3 is too big"]);
  assert_eq!(subject.subscriber_count(), 0);
}

#[rxcore_macro::test]
fn blocking_bridge_collects_values() {
  let values: Vec<_> = from_iter::<_, Infallible>(1..=5)
    .map(|v| v * v)
    .into_blocking_iter()
    .collect::<Result<_, _>>()
    .unwrap();
  assert_eq!(values, vec![1, 4, 9, 16, 25]);
}

#[rxcore_macro::test(shared)]
async fn task_handle_resolves_when_work_finishes() {
  let scheduler = SchedulerRef::from(ImmediateScheduler);
  let handle = scheduler.schedule((), |_| {});
  handle.await;
}
