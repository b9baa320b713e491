use std::cell::RefCell;
use std::rc::Rc;

use tagalong_core::{Scope, Value};
use tagalong_dom::VNode;
use tagalong_template::{CompileError, CompileOptions, Template, TemplateNode};

fn compile(markup: &str) -> Template {
    Template::compile(&TemplateNode::parse(markup), CompileOptions::default()).unwrap()
}

fn html(nodes: &[VNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            VNode::Text(t) => out.push_str(t),
            VNode::Element { tag, props, children } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in &props.attrs {
                    out.push_str(&format!(" {k}=\"{v}\""));
                }
                out.push('>');
                out.push_str(&html(children));
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
    out
}

fn render(markup: &str, data: Value) -> String {
    html(&compile(markup).render(&data, &Scope::default()))
}

fn json(src: &str) -> Value {
    Value::from(serde_json::from_str::<serde_json::Value>(src).unwrap())
}

#[test]
fn renders_text_directives() {
    assert_eq!(render(r#"<div t-text="foo"></div>"#, json(r#"{"foo": "bar"}"#)), "<div>bar</div>");
    assert_eq!(render(r#"<div t-text="foo.bar">old</div>"#, json(r#"{"foo": {"bar": "baz"}}"#)), "<div>baz</div>");
    assert_eq!(render(r#"<b t-text=".">foo</b>"#, Value::from("bar")), "<b>bar</b>");
    assert_eq!(render(r#"<b t-text="missing">kept?</b>"#, json("{}")), "<b></b>");
}

#[test]
fn renders_prefixed_attributes() {
    assert_eq!(render(r#"<div t-id="foo.bar">hi</div>"#, json(r#"{"foo": {"bar": "baz"}}"#)), r#"<div id="baz">hi</div>"#);
    assert_eq!(render(r##"<a t-href="#{{ id }}">hi</a>"##, json(r#"{"id": "foo"}"#)), r##"<a href="#foo">hi</a>"##);
    assert_eq!(render(r#"<a t-title="x => {{ id }}">hi</a>"#, json(r#"{"id": "foo"}"#)), r#"<a title="x => foo">hi</a>"#);
    assert_eq!(render(r#"<a t-title="nothing" title="static">hi</a>"#, json("{}")), "<a>hi</a>");
}

#[test]
fn renders_class_and_style_shapes() {
    let t = compile(r#"<div class="base" t-class="foo">hi</div>"#);
    let pass = |data: &str| html(&t.render(&json(data), &Scope::default()));
    assert_eq!(pass(r#"{"foo": {"bar": true, "baz": false}}"#), r#"<div class="base bar">hi</div>"#);
    assert_eq!(pass(r#"{"foo": ["x", "y"]}"#), r#"<div class="base x y">hi</div>"#);
    assert_eq!(pass(r#"{"foo": null}"#), r#"<div class="base">hi</div>"#);

    assert_eq!(
        render(r#"<div t-style="x">hi</div>"#, json(r#"{"x": {"color": "green", "fontWeight": "bold"}}"#)),
        r#"<div style="color: green; font-weight: bold;">hi</div>"#
    );
    assert_eq!(render(r#"<div t-class="foo">hi</div>"#, json(r#"{"foo": null}"#)), "<div>hi</div>");
}

#[test]
fn interprets_if_and_else() {
    let t = compile(r#"<div t-if="foo">yes</div> <span t-else>no</span>"#);
    let pass = |data: &str| html(&t.render(&json(data), &Scope::default()));
    assert_eq!(pass(r#"{"foo": 0}"#), " <span>no</span>");
    assert_eq!(pass(r#"{"foo": 1}"#), "<div>yes</div> ");

    let count = compile(r#"<div t-if="count">{{count}}</div><span t-else>none</span>"#);
    assert_eq!(html(&count.render(&json(r#"{"count": 0}"#), &Scope::default())), "<span>none</span>");
    assert_eq!(html(&count.render(&json(r#"{"count": 3}"#), &Scope::default())), "<div>3</div>");
}

#[test]
fn else_needs_an_if_sibling() {
    for markup in [
        "<span t-else>no</span>",
        r#"<div>x</div><span t-else>no</span>"#,
        r#"<div t-if="a">x</div>text<span t-else>no</span>"#,
        r#"<div t-if="a">x</div><span t-else>no</span><i t-else>again</i>"#,
    ] {
        let err = Template::compile(&TemplateNode::parse(markup), CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::ElseWithoutIf { .. }), "{markup}: {err}");
    }
}

#[test]
fn conflicting_directives_fail_compile() {
    let err = Template::compile(
        &TemplateNode::parse(r#"<ul><li t-if="a" t-else>x</li></ul>"#),
        CompileOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::ConflictingDirectives { .. }));
    assert_eq!(err.to_string(), "<li> cannot combine if with else");
}

#[test]
fn each_repeats_the_element() {
    assert_eq!(render(r#"<b t-each="things">{{.}}</b>"#, json(r#"{"things": ["foo", "bar"]}"#)), "<b>foo</b><b>bar</b>");
    assert_eq!(
        render(r#"<b t-each="things">{{.}}@{{$i}}</b>"#, json(r#"{"things": ["foo", "bar"]}"#)),
        "<b>foo@0</b><b>bar@1</b>"
    );
    assert_eq!(render(r#"<b t-each="things">{{.}}</b>"#, json(r#"{"things": []}"#)), "");
    assert_eq!(render(r#"<b t-each="things">{{.}}</b>"#, json("{}")), "");
}

#[test]
fn foreach_repeats_the_children() {
    assert_eq!(
        render(r#"<b t-foreach="things"><i>{{.}}</i></b>"#, json(r#"{"things": ["foo", "bar"]}"#)),
        "<b><i>foo</i><i>bar</i></b>"
    );
    assert_eq!(
        render(r#"<b t-foreach="things">{{.}}@{{$i}};</b>"#, json(r#"{"things": ["foo", "bar"]}"#)),
        "<b>foo@0;bar@1;</b>"
    );
    assert_eq!(render(r#"<b t-foreach="things" class="x"><i>{{.}}</i></b>"#, json(r#"{"things": []}"#)), r#"<b class="x"></b>"#);
}

#[test]
fn iterates_objects_and_strings() {
    assert_eq!(
        render(r#"<i t-each=".">{{ key }}={{ value }}</i>"#, json(r#"{"b": 1, "a": 2}"#)),
        "<i>b=1</i><i>a=2</i>"
    );
    assert_eq!(render(r#"<i t-each=".">{{ . }}</i>"#, Value::from("hey")), "<i>h</i><i>e</i><i>y</i>");
    assert_eq!(render(r#"<i t-each=".">{{ . }}</i>"#, Value::from(42)), "");
}

#[test]
fn each_condition_filters_items() {
    assert_eq!(
        render(r#"<i t-each="." t-if=". > 1">{{ . }}@{{ $i }}</i>"#, json("[1, 2, 3]")),
        "<i>2@1</i><i>3@2</i>"
    );
}

#[test]
fn nested_iterations_shadow_the_index() {
    assert_eq!(
        render(r#"<p t-each="rows"><i t-each=".">{{ $i }}</i>|{{ $i }}</p>"#, json(r#"{"rows": [["a", "b"], ["c"]]}"#)),
        "<p><i>0</i><i>1</i>|0</p><p><i>0</i>|1</p>"
    );
}

#[test]
fn skip_removes_the_subtree() {
    assert_eq!(render("hello, world<span t-skip>!</span>", json("{}")), "hello, world");
}

#[test]
fn with_narrows_the_data() {
    let t = compile(r#"<h1 t-with="items"><b t-text="length">0</b> item<i t-if="length !== 1">s</i></h1>"#);
    assert_eq!(html(&t.render(&json(r#"{"items": ["foo"]}"#), &Scope::default())), "<h1><b>1</b> item</h1>");
    assert_eq!(
        html(&t.render(&json(r#"{"items": ["foo", "bar"]}"#), &Scope::default())),
        "<h1><b>2</b> item<i>s</i></h1>"
    );
    for markup in [
        "<span t-with=\"x => x[0]\">{{ . }}</span>",
        "<span t-with=\"(x) => x[0]\">{{ . }}</span>",
        "<span t-with=\"(x) => { x[0] }\">{{ . }}</span>",
    ] {
        assert_eq!(render(markup, json(r#"["foo"]"#)), "<span>foo</span>", "{markup}");
    }
}

#[test]
fn aliases_bind_names() {
    assert_eq!(
        render(r#"<ul t-foreach="." t-as="item"><li t-text="item">Jill</li></ul>"#, json(r#"["Jill", "Jane", "Joe"]"#)),
        "<ul><li>Jill</li><li>Jane</li><li>Joe</li></ul>"
    );
    assert_eq!(
        render(r#"<li t-each="people" t-as="p">{{ p.name }}/{{ name }}</li>"#, json(r#"{"people": [{"name": "Ada"}]}"#)),
        "<li>Ada/Ada</li>"
    );
    assert_eq!(
        render(r#"<div t-as="outer"><i t-each="xs">{{ outer.label }}{{ . }}</i></div>"#, json(r#"{"label": "L", "xs": [1, 2]}"#)),
        "<div><i>L1</i><i>L2</i></div>"
    );
    assert_eq!(
        render(r#"<div t-with="user" t-as="u"><b>{{ u.name }}</b></div>"#, json(r#"{"user": {"name": "Bo"}}"#)),
        "<div><b>Bo</b></div>"
    );
}

#[test]
fn scope_helpers_are_visible() {
    let scope = Scope::new(Value::object([
        ("lower", Value::function(|args: &[Value]| Value::from(args[0].to_display().to_lowercase()))),
        ("f", Value::function(|args: &[Value]| Value::from(args[0].to_number() * args[0].to_number()))),
    ]));
    let t = compile(r#"<div t-text="lower(name)">Joe</div>"#);
    assert_eq!(html(&t.render(&json(r#"{"name": "Bill"}"#), &scope)), "<div>bill</div>");
    let arrow = compile(r#"<b t-text="x => f(x)"></b>"#);
    assert_eq!(html(&arrow.render(&Value::from(10), &scope)), "<b>100</b>");
}

#[test]
fn namespaced_dynamic_attributes() {
    let nodes = compile(r#"<svg><a t-each="items" xlink:t-href="href"></a></svg>"#)
        .render(&json(r##"{"items": [{"href": "#foo"}, {"href": "#bar"}]}"##), &Scope::default());
    assert_eq!(html(&nodes), r##"<svg><a xlink:href="#foo"></a><a xlink:href="#bar"></a></svg>"##);
    let a = &nodes[0].children()[0];
    assert_eq!(a.props().and_then(|p| p.namespace.as_deref()), Some(tagalong_dom::ns::SVG));
}

#[test]
fn prefixed_tag_names_resolve_namespaces() {
    let nodes = compile(r#"<svg:rect t-width="w"></svg:rect>"#).render(&json(r#"{"w": 3}"#), &Scope::default());
    assert_eq!(nodes[0].tag(), Some("rect"));
    assert_eq!(nodes[0].props().and_then(|p| p.namespace.as_deref()), Some(tagalong_dom::ns::SVG));
}

#[test]
fn key_attribute_sets_the_key() {
    let nodes = compile(r#"<li t-each="." t-key="id">{{ id }}</li>"#).render(&json(r#"[{"id": 7}, {"id": 9}]"#), &Scope::default());
    let keys: Vec<_> = nodes.iter().map(|n| n.props().and_then(|p| p.key.clone())).collect();
    assert_eq!(keys, [Some("7".to_string()), Some("9".to_string())]);
}

#[test]
fn events_become_listeners() {
    let seen: Rc<RefCell<Vec<String>>> = Rc::default();
    let log = seen.clone();
    let scope = Scope::new(Value::object([(
        "toggle",
        Value::function(move |args: &[Value]| {
            let name = args[0].get("name").unwrap_or_default().to_display();
            let kind = args.get(1).and_then(|e| e.get("type")).unwrap_or_default().to_display();
            log.borrow_mut().push(format!("{name}:{kind}"));
            Value::Undefined
        }),
    )]));
    let nodes = compile(r#"<button t-each="." t-onclick="(d, e) => toggle(d, e)">{{ name }}</button>"#)
        .render(&json(r#"[{"name": "a"}, {"name": "b"}]"#), &scope);
    assert_eq!(html(&nodes), "<button>a</button><button>b</button>");

    let listener = &nodes[1].props().unwrap().listeners[0];
    assert_eq!(listener.event, "click");
    (listener.handler)(&Value::object([("type", Value::from("click"))]));
    assert_eq!(*seen.borrow(), ["b:click"]);
}

#[test]
fn compiling_twice_renders_the_same_tree() {
    let markup = r#"<ul class="list"><li t-each="items" t-class="{done: done}">{{ $i }}. {{ title }}</li></ul><p t-if="!items.length">empty</p>"#;
    let data = json(r#"{"items": [{"title": "a", "done": true}, {"title": "b", "done": false}]}"#);
    let first = compile(markup).render(&data, &Scope::default());
    let second = compile(markup).render(&data, &Scope::default());
    assert_eq!(first, second);
    insta::assert_snapshot!(html(&first), @r#"<ul class="list"><li class="done">0. a</li><li>1. b</li></ul>"#);
}

#[test]
fn custom_prefix() {
    let opts = CompileOptions {
        prefix: "x-".to_string(),
        ..CompileOptions::default()
    };
    let t = Template::compile(&TemplateNode::parse(r#"<b x-each="." t-each="ignored">{{ . }}</b>"#), opts).unwrap();
    assert_eq!(html(&t.render(&json("[1, 2]"), &Scope::default())), r#"<b t-each="ignored">1</b><b t-each="ignored">2</b>"#);
}

#[test]
fn instances_carry_the_slot_of_their_element() {
    let template = compile(r#"<div t-if="on">A</div><span t-else>B</span><div><i t-each="items">{{.}}</i></div>"#);
    let slots = |nodes: &[VNode]| nodes.iter().map(|n| n.props().and_then(|p| p.slot)).collect::<Vec<_>>();

    let shown = template.render(&json(r#"{"on": true, "items": [1, 2]}"#), &Scope::default());
    let hidden = template.render(&json(r#"{"on": false, "items": [1, 2]}"#), &Scope::default());
    assert_eq!(slots(&shown), [Some(0), Some(2)]);
    assert_eq!(slots(&hidden), [Some(1), Some(2)]);
    assert_eq!(slots(shown[1].children()), [Some(3), Some(3)]);
}
