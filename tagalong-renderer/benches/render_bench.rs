use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tagalong_core::{Scope, Value};
use tagalong_dom::Document;

const LIST: &str = r#"<ul class="list"><li t-each="items" t-key="id" t-class="{done: done}">{{ $i }}. {{ title }}</li></ul>"#;

fn items(count: usize, offset: usize) -> Value {
    Value::object([(
        "items",
        Value::array((0..count).map(|i| {
            Value::object([
                ("id", Value::from((i + offset) % count)),
                ("title", Value::from(format!("item {i}"))),
                ("done", Value::from(i % 3 == 0)),
            ])
        })),
    )])
}

fn bench_render_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_list");
    group.sample_size(20);
    for &count in &[50usize, 200, 1000] {
        group.bench_with_input(BenchmarkId::new("same_data", count), &count, |b, &count| {
            let mut doc = Document::parse(LIST);
            let root = doc.root();
            let mut render = tagalong_renderer::compile(&doc, root).expect("compile");
            let data = items(count, 0);
            b.iter(|| render.render(&mut doc, root, &data, &Scope::default()));
        });
        group.bench_with_input(BenchmarkId::new("rotating_keys", count), &count, |b, &count| {
            let mut doc = Document::parse(LIST);
            let root = doc.root();
            let mut render = tagalong_renderer::compile(&doc, root).expect("compile");
            let passes: Vec<Value> = (0..4).map(|n| items(count, n)).collect();
            let mut n = 0;
            b.iter(|| {
                n = (n + 1) % passes.len();
                render.render(&mut doc, root, &passes[n], &Scope::default())
            });
        });
    }
    group.finish();
}

fn bench_render_string(c: &mut Criterion) {
    let data = items(200, 0);
    c.bench_function("render_string_200", |b| {
        b.iter(|| tagalong_renderer::render_string(LIST, &data, &Scope::default()).expect("render"))
    });
}

criterion_group!(benches, bench_render_list, bench_render_string);
criterion_main!(benches);
