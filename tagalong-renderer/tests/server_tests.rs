use tagalong_core::{Scope, Value};
use tagalong_renderer::{render_string, render_string_with};
use tagalong_template::{CompileOptions, HIDE_STYLE};

fn json(src: &str) -> Value {
    Value::from(serde_json::from_str::<serde_json::Value>(src).unwrap())
}

fn server(markup: &str, data: &str) -> String {
    render_string(markup, &json(data), &Scope::default()).unwrap()
}

#[test]
fn reads_and_writes_strings() {
    insta::assert_snapshot!(
        server(r#"<div t-if="word">{{ word }}</div>"#, r#"{"word": "hello!"}"#),
        @r#"<div t-if="word">hello!</div>"#
    );
}

#[test]
fn keeps_each_and_skips_repeats() {
    insta::assert_snapshot!(
        server(r#"<b t-each=".">{{ . }}</b>"#, "[1, 2, 3]"),
        @r#"<b t-each=".">1</b><b t-skip="">2</b><b t-skip="">3</b>"#
    );
}

#[test]
fn keeps_empty_each_as_hidden_template() {
    assert_eq!(
        server(r#"<b t-each=".">{{ . }}</b>"#, "[]"),
        format!(r#"<b t-each="." style="{HIDE_STYLE}">{{{{ . }}}}</b>"#)
    );
}

#[test]
fn output_renders_again() {
    let template = server(r#"<b t-each=".">{{ x }}</b>"#, "[]");
    assert_eq!(template, format!(r#"<b t-each="." style="{HIDE_STYLE}">{{{{ x }}}}</b>"#));
    insta::assert_snapshot!(
        server(&template, r#"[{"x": 1}, {"x": 2}, {"x": 3}]"#),
        @r#"<b t-each=".">1</b><b t-skip="">2</b><b t-skip="">3</b>"#
    );
}

#[test]
fn dynamic_attributes_are_kept_alongside_values() {
    insta::assert_snapshot!(
        server(r#"<a t-href="url" class="x" t-class="c">{{ label }}</a>"#, r#"{"url": "/u", "c": "y", "label": "go"}"#),
        @r#"<a t-href="url" class="x y" t-class="c" href="/u">go</a>"#
    );
}

#[test]
fn preserve_can_be_turned_off() {
    let html = render_string_with(
        r#"<div t-if="word">{{ word }}</div>"#,
        &json(r#"{"word": "hello!"}"#),
        &Scope::default(),
        CompileOptions::default(),
    )
    .unwrap();
    assert_eq!(html, "<div>hello!</div>");
}

#[test]
fn compile_errors_surface() {
    let err = render_string(r#"<i t-else>x</i>"#, &Value::Null, &Scope::default()).unwrap_err();
    assert_eq!(err.to_string(), "<i> has else but no preceding sibling with if");
}
