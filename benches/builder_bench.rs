//! Benchmarks for parameter sanitizing and statement building
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use harvest_reporter::query::{
    BasicConditions, FieldExpr, FilterSet, Ident, Order, Predicate, RawQueryParameters, Select,
    Series, MESSAGE_COLUMNS,
};

fn raw_params() -> RawQueryParameters {
    RawQueryParameters {
        from: "2014-10-01".to_string(),
        to: "2014-10-02".to_string(),
        territory: "north america".to_string(),
        network: "twitter".to_string(),
        field: "contributor_lang".to_string(),
        series: "messages".to_string(),
        limit: 50,
        skip: 100,
    }
}

fn bench_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize");
    let clean = raw_params();
    let hostile = RawQueryParameters {
        territory: "north'; DROP TABLE messages; --".to_string(),
        field: "contributor_lang) OR (1=1".to_string(),
        ..raw_params()
    };

    group.bench_function("clean", |b| b.iter(|| black_box(&clean).sanitize()));
    group.bench_function("hostile", |b| b.iter(|| black_box(&hostile).sanitize()));
    group.bench_function("validate", |b| b.iter(|| black_box(&clean).validate()));

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.throughput(Throughput::Elements(1));

    let scope = FilterSet::new()
        .and(Predicate::eq("territory", "north"))
        .and(Predicate::eq("network", "twitter"));

    group.bench_function("count", |b| {
        b.iter(|| Select::count(Series::Messages).filter(black_box(&scope)).build())
    });

    group.bench_function("value_counts", |b| {
        b.iter(|| {
            let expr = FieldExpr::lower(Ident::parse("tag").unwrap());
            Select::value_counts(Series::Hashtags, expr)
                .filter(black_box(&scope))
                .and(Predicate::one_of("keyword", ["rust", "go", "zig"]))
                .limit(100)
                .offset(20)
                .build()
        })
    });

    let conditions = BasicConditions::new()
        .gender("f")
        .lang("en")
        .country("US")
        .geohash("9q8yy")
        .questions_only(true);

    group.bench_function("message_page", |b| {
        b.iter(|| {
            let mut filters = scope.clone();
            filters.extend(black_box(&conditions).predicates());
            Select::columns(Series::Messages, MESSAGE_COLUMNS)
                .filter(&filters)
                .order_by(Order::Desc(Ident::parse("time").unwrap()))
                .limit(100)
                .build()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_sanitize, bench_build);
criterion_main!(benches);
