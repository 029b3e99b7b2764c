// Once clippy takes `clippy.toml` into account (for `tests` targets),
// we can remove these.
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::print_stdout)]
#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use indoc::indoc;

use specto_recorder::Recorder;
use specto_runtime::{Activation, CodeObject, Engine, Function, Value, wrap};
use specto_tracer::record::RecordSink;
use specto_tracer::tracer::Tracer;

use self::common::Capture;

fn int(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        other => panic!("integer expected, got {other:?}"),
    }
}

/// `fn add_one(x) { y = x + 1; return y }`, explicitly instrumented.
fn add_one_function(path: &str) -> Function {
    let source = indoc! {"
        fn add_one(x) {
            y = x + 1
            return y
        }
    "};

    Function::new(
        CodeObject::new("add_one", path, 1)
            .with_params(["x"])
            .with_source(source),
        |act: &mut Activation| {
            act.line(2);
            let x = int(&act.get("x")?);
            act.bind("y", x + 1);
            act.line(3);
            act.get("y")
        },
    )
}

#[test_log::test]
fn traces_a_simple_function() {
    let engine = Engine::default();
    let capture = Capture::new();
    let recorder = Arc::new(Recorder::new());

    let tracer = common::tracer(engine, &capture)
        .with_recorder(recorder.clone())
        .build()
        .expect("build tracer");

    let traced = wrap::function(&tracer, &add_one_function("add_one.sp"));

    let result = engine.call(&traced, &[Value::Int(3)]);
    assert_eq!(result, Ok(Value::Int(4)));

    assert_eq!(
        capture.scrubbed(),
        indoc! {"
            Source path:... add_one.sp
            Starting var:.. x = 3
                            call         1 fn add_one(x) {
                            line         2     y = x + 1
            New var:....... y = 4
                            line         3     return y
                            return       3     return y
            Return value:.. 4
            Elapsed time: <duration>
        "}
    );

    // One record per traced line; `x` was bound at call time and belongs
    // to the call record, `y` was discovered on line 3 and belongs to the
    // record of line 2.
    let summary: Vec<(u32, Vec<String>)> = recorder
        .changes()
        .iter()
        .map(|record| {
            let names = record.variables.iter().map(|v| v.name.clone()).collect();
            (record.line, names)
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            (1, vec!["x".to_owned()]),
            (2, vec!["y".to_owned()]),
            (3, vec![]),
        ]
    );
}

#[test]
fn unchanged_bindings_are_not_reported_again() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture).build().expect("build tracer");

    let source = indoc! {"
        fn steady(x) {
            x
            x
        }
    "};

    let steady = Function::new(
        CodeObject::new("steady", "steady.sp", 1)
            .with_params(["x"])
            .with_source(source),
        |act: &mut Activation| {
            act.line(2);
            act.line(3);
            Ok(Value::None)
        },
    );

    let traced = wrap::function(&tracer, &steady);
    engine.call(&traced, &[Value::Int(9)]).expect("call");

    let text = capture.text();

    assert_eq!(text.matches("Starting var:.. x = 9").count(), 1);
    assert!(!text.contains("New var"));
    assert!(!text.contains("Modified var"));
}

#[test]
fn truncation_shortens_to_the_exact_bound() {
    let engine = Engine::default();

    let long_string = Function::new(
        CodeObject::new("long_string", "long_string.sp", 1).with_params(["s"]),
        |act: &mut Activation| {
            act.line(2);
            act.get("s")
        },
    );

    let value = Value::from("0123456789".repeat(5).as_str());

    for (max, expected_len) in [(10, Some(10)), (0, None)] {
        let capture = Capture::new();
        let tracer = common::tracer(engine, &capture)
            .max_variable_length(max)
            .build()
            .expect("build tracer");

        let traced = wrap::function(&tracer, &long_string);
        engine.call(&traced, &[value.clone()]).expect("call");

        let line = capture
            .lines()
            .into_iter()
            .find(|line| line.starts_with("Starting var:.. s = "))
            .expect("starting var line");

        let rendered = line.trim_start_matches("Starting var:.. s = ");

        match expected_len {
            Some(len) => assert_eq!(rendered.chars().count(), len),
            // 50 characters plus the surrounding quotes
            None => assert_eq!(rendered.chars().count(), 52),
        }
    }
}

#[test]
fn call_tree_depths_stay_balanced() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture).build().expect("build tracer");

    let leaf = Function::new(
        CodeObject::new("leaf", "tree.sp", 9).with_params(["n"]),
        |act: &mut Activation| {
            act.line(10);
            Ok(Value::Int(int(&act.get("n")?) * 2))
        },
    );
    let traced_leaf = wrap::function(&tracer, &leaf);

    let mid = {
        let traced_leaf = traced_leaf.clone();
        Function::new(
            CodeObject::new("mid", "tree.sp", 5).with_params(["n"]),
            move |act: &mut Activation| {
                act.line(6);
                let a = act.call(&traced_leaf, &[act.get("n")?])?;
                act.line(7);
                let b = act.call(&traced_leaf, &[act.get("n")?])?;
                Ok(Value::Int(int(&a) + int(&b)))
            },
        )
    };
    let traced_mid = wrap::function(&tracer, &mid);

    let outer = {
        let traced_mid = traced_mid.clone();
        Function::new(
            CodeObject::new("outer", "tree.sp", 1).with_params(["n"]),
            move |act: &mut Activation| {
                act.line(2);
                let a = act.call(&traced_mid, &[act.get("n")?])?;
                act.bind("a", a);
                act.line(3);
                act.get("a")
            },
        )
    };
    let traced_outer = wrap::function(&tracer, &outer);

    let result = engine.call(&traced_outer, &[Value::Int(3)]);
    assert_eq!(result, Ok(Value::Int(12)));

    let max_depth = common::replay_call_tree(&capture.lines());
    assert_eq!(max_depth, 3);
}

#[test]
fn exceptions_are_observed_and_propagated() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture).build().expect("build tracer");

    let source = indoc! {"
        fn fail(x) {
            raise ValueError
        }
    "};

    let fail = Function::new(
        CodeObject::new("fail", "fail.sp", 1)
            .with_params(["x"])
            .with_source(source),
        |act: &mut Activation| {
            act.line(2);
            Err(act.raise("ValueError", "boom"))
        },
    );

    let traced = wrap::function(&tracer, &fail);
    let result = engine.call(&traced, &[Value::Int(1)]);

    assert_eq!(
        result,
        Err(specto_runtime::Error::raised("ValueError", "boom"))
    );

    assert_eq!(
        capture.scrubbed(),
        indoc! {"
            Source path:... fail.sp
            Starting var:.. x = 1
                            call         1 fn fail(x) {
                            line         2     raise ValueError
                            exception    2     raise ValueError
            Exception:..... ValueError: boom
            Call ended by exception
            Elapsed time: <duration>
        "}
    );
}

#[test]
fn unreadable_sources_degrade_to_the_placeholder() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture).build().expect("build tracer");

    let ghost = Function::new(
        CodeObject::new("ghost", "/no/such/dir/ghost.sp", 1).with_params(["x"]),
        |act: &mut Activation| {
            act.line(2);
            act.get("x")
        },
    );

    let traced = wrap::function(&tracer, &ghost);
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    assert_eq!(
        capture.scrubbed(),
        indoc! {"
            Source path:... /no/such/dir/ghost.sp
            Starting var:.. x = 1
                            call         1 SOURCE IS UNAVAILABLE
                            line         2 SOURCE IS UNAVAILABLE
                            return       2 SOURCE IS UNAVAILABLE
            Return value:.. 1
            Elapsed time: <duration>
        "}
    );
}

#[test]
fn decorated_definitions_report_the_fn_line() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture).build().expect("build tracer");

    let source = indoc! {"
        @traced
        fn deco(x) {
            return x
        }
    "};

    // The code object of a decorated definition starts on the decorator
    // line; the call step must report the `fn` line that follows instead.
    let deco = Function::new(
        CodeObject::new("deco", "deco.sp", 1)
            .with_params(["x"])
            .with_source(source),
        |act: &mut Activation| {
            act.line(3);
            act.get("x")
        },
    );

    let traced = wrap::function(&tracer, &deco);
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    let text = capture.text();
    assert!(text.contains("call         2 fn deco(x) {"));
    assert!(!text.contains("call         1 @traced"));
}

#[test]
fn watches_report_even_when_locals_are_suppressed() {
    let engine = Engine::default();
    let capture = Capture::new();
    let recorder = Arc::new(Recorder::new());

    // only-watch stays at its default (true): locals are suppressed, the
    // watch and the exploding watch still report.
    let tracer = Tracer::builder()
        .with_runtime(engine)
        .output(capture.output())
        .with_recorder(recorder.clone())
        .watch("total")
        .watch_explode("items")
        .build()
        .expect("build tracer");

    let source = indoc! {"
        fn tally(items) {
            total = 0
            total = total + items[0]
        }
    "};

    let tally = Function::new(
        CodeObject::new("tally", "tally.sp", 1)
            .with_params(["items"])
            .with_source(source),
        |act: &mut Activation| {
            act.line(2);
            act.bind("total", 0);
            act.line(3);
            let Value::List(items) = act.get("items")? else {
                return Err(act.raise("TypeError", "list expected"));
            };
            let total = int(&act.get("total")?) + int(&items[0]);
            act.bind("total", total);
            Ok(Value::Int(total))
        },
    );

    let traced = wrap::function(&tracer, &tally);
    let result = engine.call(&traced, &[Value::from(vec![7, 8])]);
    assert_eq!(result, Ok(Value::Int(7)));

    assert_eq!(
        capture.scrubbed(),
        indoc! {"
            Source path:... tally.sp
            Starting var:.. items = [7, 8]
            Starting var:.. items[0] = 7
            Starting var:.. items[1] = 8
                            call         1 fn tally(items) {
                            line         2     total = 0
            New var:....... total = 0
                            line         3     total = total + items[0]
            Modified var:.. total = 7
                            return       3     total = total + items[0]
            Return value:.. 7
            Elapsed time: <duration>
        "}
    );
}

#[test]
fn prefix_is_prepended_to_every_line() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture)
        .prefix("trace| ")
        .build()
        .expect("build tracer");

    let traced = wrap::function(&tracer, &add_one_function("prefixed.sp"));
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    let lines = capture.lines();
    assert!(!lines.is_empty());
    assert!(lines.iter().all(|line| line.starts_with("trace| ")));
}

#[test]
fn thread_label_column_is_padded() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture)
        .thread_label(true)
        .build()
        .expect("build tracer");

    let traced = wrap::function(&tracer, &add_one_function("labeled.sp"));
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    let label = regex::Regex::new(r"^ {16}\d+-\S+ +call ").unwrap();

    assert!(
        capture.lines().iter().any(|line| label.is_match(line)),
        "no labeled call line in:\n{}",
        capture.text()
    );
}

#[test]
fn relative_time_fills_the_timestamp_column() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture)
        .relative_time(true)
        .build()
        .expect("build tracer");

    let traced = wrap::function(&tracer, &add_one_function("timed.sp"));
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    let stamped = regex::Regex::new(r"^\d{2}:\d{2}:\d{2}\.\d{6} call ").unwrap();

    assert!(
        capture.lines().iter().any(|line| stamped.is_match(line)),
        "no timestamped call line in:\n{}",
        capture.text()
    );
}

#[test]
fn custom_representations_apply() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture)
        .custom_scalar_repr(|value| format!("<{}>", value.render()))
        .build()
        .expect("build tracer");

    let traced = wrap::function(&tracer, &add_one_function("custom.sp"));
    engine.call(&traced, &[Value::Int(3)]).expect("call");

    let text = capture.text();
    assert!(text.contains("Starting var:.. x = <3>"));
    assert!(text.contains("Return value:.. <4>"));
}

#[test]
fn source_path_is_reported_on_change_only() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture).build().expect("build tracer");

    let first = wrap::function(&tracer, &add_one_function("first.sp"));
    let second = wrap::function(&tracer, &add_one_function("second.sp"));

    engine.call(&first, &[Value::Int(1)]).expect("call");
    engine.call(&first, &[Value::Int(2)]).expect("call");
    engine.call(&second, &[Value::Int(3)]).expect("call");
    engine.call(&first, &[Value::Int(4)]).expect("call");

    let text = capture.text();
    assert_eq!(text.matches("Source path:... first.sp").count(), 2);
    assert_eq!(text.matches("Source path:... second.sp").count(), 1);
}

#[test]
fn helper_frames_are_traced_at_depth_two() {
    let engine = Engine::default();

    let helper = Function::new(
        CodeObject::new("helper", "helper.sp", 1).with_params(["n"]),
        |act: &mut Activation| {
            act.line(2);
            Ok(Value::Int(int(&act.get("n")?) * 2))
        },
    );

    let make_outer = |helper: Function| {
        Function::new(
            CodeObject::new("outer", "outer_depth.sp", 1).with_params(["n"]),
            move |act: &mut Activation| {
                act.line(2);
                let n = act.get("n")?;
                act.call(&helper, &[n])
            },
        )
    };

    for (depth, expect_helper) in [(1, false), (2, true)] {
        let capture = Capture::new();
        let tracer = common::tracer(engine, &capture)
            .depth(depth)
            .build()
            .expect("build tracer");

        let traced = wrap::function(&tracer, &make_outer(helper.clone()));
        let result = engine.call(&traced, &[Value::Int(4)]);
        assert_eq!(result, Ok(Value::Int(8)));

        let text = capture.text();
        let helper_traced = text.contains("Source path:... helper.sp");

        assert_eq!(helper_traced, expect_helper, "depth {depth}:\n{text}");

        if expect_helper {
            // the helper's steps are one level deeper
            assert!(text.contains("    Starting var:.. n = 4"));
            assert!(
                text.contains("                    call         1"),
                "indented call line missing:\n{text}"
            );
        }
    }
}

#[test]
fn scoped_activation_traces_the_remaining_frame() {
    let engine = Engine::default();
    let capture = Capture::new();
    let recorder = Arc::new(Recorder::new());

    let tracer = common::tracer(engine, &capture)
        .with_recorder(recorder.clone())
        .build()
        .expect("build tracer");

    let source = indoc! {"
        fn main_prog(x) {
            setup()
            y = 6
            teardown()
            after()
        }
    "};

    let scope_tracer = tracer.clone();
    let main_prog = Function::new(
        CodeObject::new("main_prog", "main_prog.sp", 1)
            .with_params(["x"])
            .with_source(source),
        move |act: &mut Activation| {
            act.line(2);

            let scope = scope_tracer.activate();
            act.line(3);
            act.bind("y", 6);
            act.line(4);
            drop(scope);

            // past the scope: not traced
            act.line(5);
            Ok(Value::None)
        },
    );

    // note: the function is not wrapped; only the scope traces it
    engine.call(&main_prog, &[Value::Int(1)]).expect("call");

    assert_eq!(
        capture.scrubbed(),
        indoc! {"
            Source path:... main_prog.sp
            New var:....... x = 1
                            line         3     y = 6
            New var:....... y = 6
                            line         4     teardown()
            Elapsed time: <duration>
        "}
    );
}

#[test]
fn invalid_configurations_fail_eagerly() {
    let engine = Engine::default();
    let capture = Capture::new();

    assert!(matches!(
        common::tracer(engine, &capture).depth(0).build(),
        Err(specto_tracer::Error::InvalidDepth(0))
    ));

    assert!(matches!(
        common::tracer(engine, &capture).overwrite(true).build(),
        Err(specto_tracer::Error::OverwriteNeedsPath)
    ));
}

#[test]
fn file_output_truncates_once_then_appends() {
    let engine = Engine::default();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trace.log");

    std::fs::write(&path, "stale content\n").expect("seed file");

    let tracer = Tracer::builder()
        .with_runtime(engine)
        .output(path.clone())
        .overwrite(true)
        .only_watch(false)
        .build()
        .expect("build tracer");

    let traced = wrap::function(&tracer, &add_one_function("filed.sp"));
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    let content = std::fs::read_to_string(&path).expect("read log");

    // truncated on the first write, appended for the rest of the trace
    assert!(!content.contains("stale content"));
    assert!(content.contains("Starting var:.. x = 1"));
    assert!(content.contains("Elapsed time: "));
}

#[test]
fn file_output_appends_without_overwrite() {
    let engine = Engine::default();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trace.log");

    std::fs::write(&path, "previous session\n").expect("seed file");

    let tracer = Tracer::builder()
        .with_runtime(engine)
        .output(path.clone())
        .only_watch(false)
        .build()
        .expect("build tracer");

    let traced = wrap::function(&tracer, &add_one_function("appended.sp"));
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    let content = std::fs::read_to_string(&path).expect("read log");

    assert!(content.starts_with("previous session\n"));
    assert!(content.contains("Starting var:.. x = 1"));
}

#[test]
fn observed_functions_record_accesses() {
    let engine = Engine::default();
    let capture = Capture::new();
    let recorder = Arc::new(Recorder::new());

    let tracer = common::tracer(engine, &capture)
        .with_recorder(recorder.clone())
        .build()
        .expect("build tracer");

    let lookup = Function::new(
        CodeObject::new("lookup", "observed.sp", 9).with_params(["n"]),
        |act: &mut Activation| {
            act.line(10);
            act.get("n")
        },
    );
    let observed = wrap::observed(recorder.clone() as Arc<dyn RecordSink>, &lookup);

    let main = {
        let observed = observed.clone();
        Function::new(
            CodeObject::new("main", "observed_main.sp", 1).with_params(["n"]),
            move |act: &mut Activation| {
                act.line(2);
                act.call(&observed, &[act.get("n")?])
            },
        )
    };

    let traced = wrap::function(&tracer, &main);
    engine.call(&traced, &[Value::Int(42)]).expect("call");

    let records = recorder.changes();
    let last = records.last().expect("records");

    assert_eq!(last.line, 2);
    assert_eq!(last.accesses, vec![Value::Int(42)]);
}

#[test]
fn reentrant_activation_restores_the_installed_callback() {
    use specto_tracer::runtime::{Continuation, Runtime, Step, StepHandler};

    struct Probe;

    impl StepHandler<Engine> for Probe {
        fn on_step(
            &self,
            _runtime: &Engine,
            _frame: &specto_runtime::Frame,
            _step: &Step,
        ) -> Continuation {
            Continuation::Trace
        }
    }

    let engine = Engine::default();

    for n in [1_usize, 2, 5] {
        let probe: Arc<dyn StepHandler<Engine>> = Arc::new(Probe);
        engine.install(Some(probe.clone()));

        let capture = Capture::new();
        let tracer = common::tracer(engine, &capture).build().expect("build tracer");

        let mut scopes = Vec::new();
        for _ in 0..n {
            scopes.push(tracer.activate());
        }

        while let Some(scope) = scopes.pop() {
            drop(scope);
        }

        let restored = engine.installed().expect("a callback is restored");
        assert!(
            Arc::ptr_eq(&restored, &probe),
            "nesting depth {n} must restore the exact previous callback"
        );

        engine.install(None);
    }
}

mod generators {
    use indoc::indoc;

    use specto_runtime::{
        Activation, CodeObject, Engine, GenFlow, GenInput, GenSegment, GeneratorFn, Value, wrap,
    };
    use specto_tracer::wrap::{Resumable, ResumeOutcome};

    use super::common::{self, Capture};
    use super::int;

    fn counter_generator(path: &str) -> GeneratorFn {
        let source = indoc! {"
            fn counter(n) {
                yield n
                n = n + 1
                yield n
            }
        "};

        let segments: Vec<GenSegment> = vec![
            Box::new(|act: &mut Activation, input: GenInput| {
                input.value()?;
                act.line(2);
                act.get("n").map(GenFlow::Yield)
            }),
            Box::new(|act: &mut Activation, input: GenInput| {
                input.value()?;
                act.line(3);
                let n = int(&act.get("n")?);
                act.bind("n", n + 1);
                act.line(4);
                act.get("n").map(GenFlow::Yield)
            }),
            Box::new(|_act: &mut Activation, input: GenInput| {
                input.value()?;
                Ok(GenFlow::Return)
            }),
        ];

        GeneratorFn::new(
            CodeObject::new("counter", path, 1)
                .with_params(["n"])
                .with_source(source),
            segments,
        )
    }

    #[test]
    fn one_resumption_traces_one_step() {
        let engine = Engine::default();
        let capture = Capture::new();

        let tracer = common::tracer(engine, &capture).build().expect("build tracer");

        let traced = wrap::generator_fn(&tracer, &counter_generator("counter.sp"));
        let mut counter = traced.instantiate(&engine, &[Value::Int(5)]).expect("instantiate");

        let first = counter.resume(None).expect("first resume");
        assert_eq!(first, ResumeOutcome::Yielded(Value::Int(5)));

        // only the events up to the first yield, nothing from the rest of
        // the body
        assert_eq!(
            capture.scrubbed(),
            indoc! {"
                Source path:... counter.sp
                Starting var:.. n = 5
                                call         1 fn counter(n) {
                                line         2     yield n
                                return       2     yield n
                Return value:.. 5
                Elapsed time: <duration>
            "}
        );

        let second = counter.resume(None).expect("second resume");
        assert_eq!(second, ResumeOutcome::Yielded(Value::Int(6)));

        let text = capture.text();
        assert!(text.contains("Modified var:.. n = 6"));
        assert_eq!(text.matches("Elapsed time: ").count(), 2);

        assert_eq!(counter.resume(None).expect("last resume"), ResumeOutcome::Complete);
        // a completed generator stays complete
        assert_eq!(counter.resume(None).expect("extra resume"), ResumeOutcome::Complete);
    }

    #[test]
    fn consumer_time_between_resumptions_is_excluded() {
        let engine = Engine::default();
        let capture = Capture::new();

        let tracer = common::tracer(engine, &capture).build().expect("build tracer");

        let traced = wrap::generator_fn(&tracer, &counter_generator("counter_idle.sp"));
        let mut counter = traced.instantiate(&engine, &[Value::Int(1)]).expect("instantiate");

        counter.resume(None).expect("resume");

        // the consumer dawdles; the pause must not show up in the next
        // resumption's elapsed time
        std::thread::sleep(std::time::Duration::from_millis(80));

        counter.resume(None).expect("resume");

        let durations = regex::Regex::new(r"Elapsed time: (\d{2}):(\d{2}):(\d{2})\.(\d{6})")
            .unwrap()
            .captures_iter(&capture.text())
            .map(|c| c[4].parse::<u64>().unwrap() + c[3].parse::<u64>().unwrap() * 1_000_000)
            .collect::<Vec<_>>();

        assert_eq!(durations.len(), 2);
        assert!(
            durations.iter().all(|&micros| micros < 50_000),
            "activation spans covered a consumer pause: {durations:?}"
        );
    }

    #[test]
    fn injected_errors_propagate_through_the_generator() {
        let engine = Engine::default();
        let capture = Capture::new();

        let tracer = common::tracer(engine, &capture).build().expect("build tracer");

        let traced = wrap::generator_fn(&tracer, &counter_generator("counter_throw.sp"));
        let mut counter = traced.instantiate(&engine, &[Value::Int(1)]).expect("instantiate");

        counter.resume(None).expect("first resume");

        let error = specto_runtime::Error::raised("Halt", "stop iterating");
        let result = counter.resume_with_error(error.clone());

        assert_eq!(result, Err(error));

        let text = capture.text();
        assert!(text.contains("Exception:..... Halt: stop iterating"));
        assert!(text.contains("Call ended by exception"));

        assert_eq!(counter.resume(None).expect("after error"), ResumeOutcome::Complete);
    }

    #[test]
    fn sent_values_reach_the_generator() {
        let engine = Engine::default();
        let capture = Capture::new();

        let tracer = common::tracer(engine, &capture).build().expect("build tracer");

        let segments: Vec<GenSegment> = vec![
            Box::new(|act: &mut Activation, input: GenInput| {
                input.value()?;
                act.line(2);
                act.get("seed").map(GenFlow::Yield)
            }),
            Box::new(|act: &mut Activation, input: GenInput| {
                let sent = input.value()?.unwrap_or(Value::None);
                act.bind("got", sent);
                act.line(3);
                act.get("got").map(GenFlow::Yield)
            }),
        ];

        let echo = GeneratorFn::new(
            CodeObject::new("echo", "echo.sp", 1).with_params(["seed"]),
            segments,
        );

        let traced = wrap::generator_fn(&tracer, &echo);
        let mut echo = traced.instantiate(&engine, &[Value::Int(0)]).expect("instantiate");

        echo.resume(None).expect("first resume");

        let outcome = echo.resume(Some(Value::from("ping"))).expect("send");
        assert_eq!(outcome, ResumeOutcome::Yielded(Value::from("ping")));

        assert!(capture.text().contains("New var:....... got = 'ping'"));
    }
}

mod classes {
    use specto_runtime::{
        Activation, Callable, Class, CodeObject, CoroutineFn, Engine, Function, GenFlow, GenInput,
        GenSegment, GeneratorFn, Value, wrap,
    };

    use super::common::{self, Capture};
    use super::int;

    fn math_class() -> Class {
        let double = Function::new(
            CodeObject::new("double", "math.sp", 2).with_params(["x"]),
            |act: &mut Activation| {
                act.line(3);
                Ok(Value::Int(int(&act.get("x")?) * 2))
            },
        );

        let naturals: Vec<GenSegment> = vec![Box::new(
            |act: &mut Activation, input: GenInput| {
                input.value()?;
                act.line(7);
                Ok(GenFlow::Yield(Value::Int(0)))
            },
        )];

        Class::new("Math")
            .define("double", double)
            .define(
                "naturals",
                GeneratorFn::new(
                    CodeObject::new("naturals", "math.sp", 6).with_params(Vec::<String>::new()),
                    naturals,
                ),
            )
            .define(
                "fetch",
                CoroutineFn::new(CodeObject::new("fetch", "math.sp", 10).with_params(["url"])),
            )
    }

    #[test]
    fn class_wrapping_instruments_functions_and_generators() {
        let engine = Engine::default();
        let capture = Capture::new();

        let tracer = common::tracer(engine, &capture).build().expect("build tracer");

        let class = math_class();
        let traced = wrap::class_def(&tracer, &class);

        // the plain function was replaced by a wrapper
        let Some(Callable::Function(double)) = traced.method("double") else {
            panic!("double must stay a plain function");
        };
        let Some(Callable::Function(original)) = class.method("double") else {
            unreachable!();
        };
        assert_ne!(double.code().id(), original.code().id());

        let result = engine.call(double, &[Value::Int(21)]);
        assert_eq!(result, Ok(Value::Int(42)));
        assert!(capture.text().contains("Starting var:.. x = 21"));

        // the generator function was replaced too
        let Some(Callable::Generator(naturals)) = traced.method("naturals") else {
            panic!("naturals must stay a generator function");
        };
        let mut naturals = naturals.instantiate(&engine, &[]).expect("instantiate");

        use specto_tracer::wrap::Resumable;
        naturals.resume(None).expect("resume");
        assert!(capture.text().contains("line         7"));
    }

    #[test]
    fn class_wrapping_skips_coroutines() {
        let engine = Engine::default();
        let capture = Capture::new();

        let tracer = common::tracer(engine, &capture).build().expect("build tracer");

        let traced = wrap::class_def(&tracer, &math_class());

        let Some(Callable::Coroutine(fetch)) = traced.method("fetch") else {
            panic!("coroutines are left untouched");
        };
        assert_eq!(fetch.code().name(), "fetch");
    }

    #[test]
    fn instrumenting_a_coroutine_directly_is_an_error() {
        let engine = Engine::default();
        let capture = Capture::new();

        let tracer = common::tracer(engine, &capture).build().expect("build tracer");

        let fetch = Callable::Coroutine(CoroutineFn::new(
            CodeObject::new("fetch", "coro.sp", 1).with_params(["url"]),
        ));

        assert!(matches!(
            wrap::callable(&tracer, &fetch),
            Err(specto_tracer::Error::UnsupportedTarget)
        ));
    }
}

#[test]
fn fallback_log_path_serves_non_default_output() {
    let engine = Engine::default();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fallback.log");

    specto_tracer::sink::set_default_log_path(Some(path.clone()));

    // default output off, no explicit target: the sink resolves to the
    // process-wide fallback path, at build time
    let tracer = Tracer::builder()
        .with_runtime(engine)
        .default_output(false)
        .only_watch(false)
        .build()
        .expect("build tracer");

    specto_tracer::sink::set_default_log_path(None);

    let traced = wrap::function(&tracer, &add_one_function("fallback.sp"));
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    let content = std::fs::read_to_string(&path).expect("read fallback log");
    assert!(content.contains("Starting var:.. x = 1"));
    assert!(content.contains("Elapsed time: "));
}

#[test]
fn session_inputs_resolve_synthetic_sources() {
    let engine = Engine::default();
    let capture = Capture::new();

    let tracer = common::tracer(engine, &capture).build().expect("build tracer");

    engine.record_session_input(2, "fn typed(x) {\n    return x\n}");

    // synthetic path, no inline source: the locator falls back to the
    // recorded session history
    let typed = Function::new(
        CodeObject::new("typed", "<session-input-2>", 1).with_params(["x"]),
        |act: &mut Activation| {
            act.line(2);
            act.get("x")
        },
    );

    let traced = wrap::function(&tracer, &typed);
    engine.call(&traced, &[Value::Int(1)]).expect("call");

    let text = capture.text();
    assert!(text.contains("Source path:... <session-input-2>"));
    assert!(text.contains("call         1 fn typed(x) {"));
    assert!(text.contains("line         2     return x"));
}
