//! Subscription completeness: a sink contains exactly the entities that
//! currently possess every component type the subscription requires.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use rewind_ecs::{
    declare_component, no_access, read, EcsContext, EntitySink, EntitySubscriptionRegistration,
};

#[derive(Clone, Debug, PartialEq)]
struct Position {
    x: f32,
}
declare_component!(Position, "Position");

#[derive(Clone, Debug, PartialEq)]
struct Health {
    value: u32,
}
declare_component!(Health, "Health");

#[derive(Clone, Debug, PartialEq)]
struct Team {
    index: u8,
}
declare_component!(Team, "Team");

#[test]
fn sink_tracks_membership_through_arbitrary_mutation_order() {
    let ctx = EcsContext::with_worker_threads(1);
    let sink = EntitySink::new();
    let _subscription = ctx.subscribe(vec![EntitySubscriptionRegistration::new(
        vec![read::<Position>(), read::<Health>()],
        sink.clone(),
    )]);

    let entity = ctx.create_entity();
    assert!(!sink.contains(entity));

    ctx.add_component(entity, Position { x: 0.0 });
    assert!(!sink.contains(entity));

    ctx.add_component(entity, Health { value: 100 });
    assert!(sink.contains(entity));

    ctx.remove_component::<Health>(entity);
    assert!(!sink.contains(entity));

    ctx.add_component(entity, Health { value: 50 });
    assert!(sink.contains(entity));

    ctx.remove_component::<Position>(entity);
    assert!(!sink.contains(entity));
}

#[test]
fn subscription_seeds_sink_with_preexisting_entities() {
    let ctx = EcsContext::with_worker_threads(1);

    let matching = ctx.create_entity();
    ctx.add_component(matching, Position { x: 1.0 });
    ctx.add_component(matching, Health { value: 1 });

    let partial = ctx.create_entity();
    ctx.add_component(partial, Position { x: 2.0 });

    let sink = EntitySink::new();
    let added = Arc::new(AtomicU32::new(0));
    let added_counter = Arc::clone(&added);
    let _subscription = ctx.subscribe(vec![EntitySubscriptionRegistration::new(
        vec![read::<Position>(), read::<Health>()],
        sink.clone(),
    )
    .with_callbacks(
        Some(Box::new(move |_entity| {
            added_counter.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    )]);

    assert!(sink.contains(matching));
    assert!(!sink.contains(partial));
    assert_eq!(added.load(Ordering::SeqCst), 1);
}

#[test]
fn add_callback_fires_exactly_once_when_last_required_type_arrives() {
    // Entity registered for {Position, Health}; a subscription requiring
    // {Position, Health, Team} must not include it until Team is added.
    let ctx = EcsContext::with_worker_threads(1);

    let sink = EntitySink::new();
    let added = Arc::new(AtomicU32::new(0));
    let added_counter = Arc::clone(&added);
    let _subscription = ctx.subscribe(vec![EntitySubscriptionRegistration::new(
        vec![read::<Position>(), read::<Health>(), no_access::<Team>()],
        sink.clone(),
    )
    .with_callbacks(
        Some(Box::new(move |_entity| {
            added_counter.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    )]);

    let entity = ctx.create_entity();
    ctx.add_component(entity, Position { x: 0.0 });
    ctx.add_component(entity, Health { value: 100 });
    assert!(!sink.contains(entity));
    assert_eq!(added.load(Ordering::SeqCst), 0);

    ctx.add_component(entity, Team { index: 1 });
    assert!(sink.contains(entity));
    assert_eq!(added.load(Ordering::SeqCst), 1);
}

#[test]
fn remove_callback_sees_entity_still_in_sink() {
    let ctx = EcsContext::with_worker_threads(1);

    let sink = EntitySink::new();
    let observed_alive = Arc::new(AtomicBool::new(false));

    let sink_for_callback = sink.clone();
    let observed = Arc::clone(&observed_alive);
    let _subscription = ctx.subscribe(vec![EntitySubscriptionRegistration::new(
        vec![read::<Position>()],
        sink.clone(),
    )
    .with_callbacks(
        None,
        Some(Box::new(move |entity| {
            observed.store(sink_for_callback.contains(entity), Ordering::SeqCst);
        })),
    )]);

    let entity = ctx.create_entity();
    ctx.add_component(entity, Position { x: 3.0 });
    assert!(sink.contains(entity));

    ctx.remove_component::<Position>(entity);
    assert!(observed_alive.load(Ordering::SeqCst));
    assert!(!sink.contains(entity));
}

#[test]
fn entity_deletion_empties_sinks_after_tick() {
    let ctx = EcsContext::with_worker_threads(1);

    let sink = EntitySink::new();
    let _subscription = ctx.subscribe(vec![EntitySubscriptionRegistration::new(
        vec![read::<Position>(), read::<Health>()],
        sink.clone(),
    )]);

    let entity = ctx.create_entity();
    ctx.add_component(entity, Position { x: 0.0 });
    ctx.add_component(entity, Health { value: 10 });
    assert!(sink.contains(entity));

    // deletions are deferred until the tick's phases complete
    ctx.remove_entity(entity);
    assert!(sink.contains(entity));

    ctx.tick(1.0 / 60.0);
    assert!(!sink.contains(entity));
    assert!(!ctx.has_component::<Position>(entity));
    assert!(!ctx.has_component::<Health>(entity));
}

#[test]
fn unsubscribe_on_drop_stops_updates() {
    let ctx = EcsContext::with_worker_threads(1);

    let sink = EntitySink::new();
    let subscription = ctx.subscribe(vec![EntitySubscriptionRegistration::new(
        vec![read::<Position>()],
        sink.clone(),
    )]);
    drop(subscription);

    let entity = ctx.create_entity();
    ctx.add_component(entity, Position { x: 0.0 });
    assert!(!sink.contains(entity));
}
