use parsync_core::{Strategy, SyncConfig};
use parsync_exec::executor::PoolSizing;

fn sizing(min: u32, max: u32) -> PoolSizing {
    let config = SyncConfig {
        min_workers: min,
        max_workers: max,
        ..Default::default()
    };
    PoolSizing::new(&config, 4.0)
}

#[test]
fn every_strategy_stays_within_bounds() {
    let s = sizing(2, 8);
    for strategy in Strategy::ALL {
        for depth in [0usize, 1, 3, 8, 50, 10_000] {
            for active in 0..=10u32 {
                for open in [false, true] {
                    let target = s.target(strategy, depth, active, open);
                    assert!(
                        (2..=8).contains(&target),
                        "{strategy:?} depth={depth} active={active} open={open} -> {target}"
                    );
                }
            }
        }
    }
}

#[test]
fn speed_saturates_while_work_is_queued() {
    let s = sizing(2, 8);
    assert_eq!(s.target(Strategy::Speed, 1, 2, false), 8);
    assert_eq!(s.target(Strategy::Speed, 0, 8, false), 2);
}

#[test]
fn speed_holds_pool_between_arrivals() {
    let s = sizing(2, 8);
    // Queue drained by dispatch but the source is still producing.
    assert_eq!(s.target(Strategy::Speed, 0, 8, true), 8);
    assert_eq!(s.target(Strategy::Speed, 0, 5, true), 5);
    // Never below the floor, even when holding.
    assert_eq!(s.target(Strategy::Speed, 0, 0, true), 2);
    // Source exhausted: shrink back to the floor.
    assert_eq!(s.target(Strategy::Speed, 0, 8, false), 2);
}

#[test]
fn cost_grows_one_worker_past_high_water() {
    let s = sizing(1, 8);
    // 3 workers, 12 queued: exactly at the mark, hold.
    assert_eq!(s.target(Strategy::Cost, 12, 3, false), 3);
    assert_eq!(s.target(Strategy::Cost, 13, 3, false), 4);
    // Less than one batch per worker: shrink by one.
    assert_eq!(s.target(Strategy::Cost, 1, 3, false), 2);
    assert_eq!(s.target(Strategy::Cost, 0, 1, false), 1);
    assert_eq!(s.target(Strategy::Cost, 0, 0, false), 1);
}

#[test]
fn balanced_scales_with_queue_depth() {
    let s = sizing(1, 4);
    assert_eq!(s.target(Strategy::Balanced, 0, 1, false), 1);
    assert_eq!(s.target(Strategy::Balanced, 2, 1, false), 3);
    assert_eq!(s.target(Strategy::Balanced, 4, 1, false), 4);
    assert_eq!(s.target(Strategy::Balanced, 400, 1, false), 4);

    let mut last = 0;
    for depth in 0..10 {
        let t = s.target(Strategy::Balanced, depth, 1, false);
        assert!(t >= last, "balanced must not shrink as depth grows");
        last = t;
    }
}

#[test]
fn fixed_pool_never_moves() {
    let s = sizing(3, 3);
    for strategy in Strategy::ALL {
        assert_eq!(s.target(strategy, 0, 3, false), 3);
        assert_eq!(s.target(strategy, 100, 3, false), 3);
    }
}
