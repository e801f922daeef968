//! Compile and render throughput
//!
//! Run with: cargo bench --bench compile_benchmarks

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use radius_control::generators::policies;
use radius_control::model::{PolicyAction, PolicyCondition};
use radius_control::{AuthorizationProfile, PolicyOutcome, UnlangPolicy, compile};
use radius_proto::dynauth::{RequestOptions, build_coa_request};
use radius_proto::{CoaChange, SessionIdentifiers, Vendor};
use std::collections::BTreeMap;
use std::hint::black_box;

fn policy_set(count: usize) -> (Vec<UnlangPolicy>, BTreeMap<i64, AuthorizationProfile>) {
    let mut profiles = BTreeMap::new();
    for id in 0..10 {
        let mut profile = AuthorizationProfile::new(id, format!("VLAN{}", 100 + id));
        profile.vlan_id = Some(100 + id as u16);
        profile.session_timeout = Some(3600);
        profile.group_policy = Some(format!("acl-{}", id));
        profiles.insert(id, profile);
    }

    let policies = (0..count)
        .map(|i| {
            let outcome = if i % 3 == 0 {
                PolicyOutcome::new(PolicyAction::Reject)
            } else {
                PolicyOutcome::apply_profile((i % 10) as i64)
            };
            UnlangPolicy::new(i as i64, format!("policy-{}", i), (i % 50) as i32, outcome)
                .with_condition(PolicyCondition::new(
                    "Called-Station-Id",
                    "=~",
                    &format!("^ssid-{}$", i),
                ))
        })
        .collect();
    (policies, profiles)
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_and_render");

    for count in [10, 100, 500] {
        let (policies, profiles) = policy_set(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let compiled = compile(black_box(&policies), black_box(&profiles))
                    .expect("benchmark policies compile");
                policies::render(&compiled)
            });
        });
    }

    group.finish();
}

fn bench_coa_request(c: &mut Criterion) {
    let session = SessionIdentifiers {
        user_name: Some("alice".to_string()),
        acct_session_id: Some("0000ABCD".to_string()),
        calling_station_id: Some("aa-bb-cc-dd-ee-ff".to_string()),
    };
    let changes = [
        CoaChange::GroupPolicy("quarantine".to_string()),
        CoaChange::SecurityGroupTag(17),
    ];
    let options = RequestOptions {
        identifier: 1,
        secret: b"testing123",
        nas_address: Some("10.0.0.1".parse().expect("valid address")),
        message_authenticator: true,
    };

    c.bench_function("coa_request_encode", |b| {
        b.iter(|| {
            build_coa_request(black_box(&session), black_box(&changes), Vendor::Ise, &options)
                .and_then(|packet| Ok(packet.encode()?))
                .expect("request builds")
        });
    });
}

criterion_group!(benches, bench_compile, bench_coa_request);
criterion_main!(benches);
