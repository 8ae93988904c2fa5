//! Centralized integration tests for reflect-impl crate
use infrastructure_common::{
    handler_fn, ClassBuilder, ClassDescriptor, ConstructorDescriptor, Exception, FieldDescriptor,
    InterceptionHandler, MethodDescriptor, NativeAccessor, ObjectRef, Primitive, ReflectError,
    RuntimeConfig, TypeRef, Value,
};
use mockall::mock;
use reflect_abstractions::{
    ConstructorInvoker, FieldInvoker, InvokerStrategy, ProxyConfig, ResolvedConstructor,
    ResolvedField, Tier, TierError,
};
use reflect_impl::{ReflectionRuntime, ReflectiveStrategy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mock! {
    Handler {}

    impl InterceptionHandler for Handler {
        fn invoke(&self, proxy: &ObjectRef, method: &str, args: Vec<Value>) -> Result<Value, Exception>;
    }
}

mock! {
    Strategy {}

    impl InvokerStrategy for Strategy {
        fn tier(&self) -> Tier;
        fn compile_constructor(&self, member: &ResolvedConstructor) -> Result<Arc<dyn ConstructorInvoker>, TierError>;
        fn compile_field(&self, member: &ResolvedField) -> Result<Arc<dyn FieldInvoker>, TierError>;
    }
}

/// 测试类型：两个字段，一个 (String, int) 构造器，带原生入口
fn person() -> Arc<ClassDescriptor> {
    ClassBuilder::class("app.Person")
        .field(FieldDescriptor::new("name", TypeRef::String))
        .field(
            FieldDescriptor::new("age", TypeRef::Primitive(Primitive::Int)).with_native(NativeAccessor::new(
                |object: &ObjectRef| object.get("age").unwrap_or(Value::Int(0)),
                |object: &ObjectRef, value| {
                    let _ = object.set("age", value);
                },
            )),
        )
        .constructor(
            ConstructorDescriptor::new(
                vec![TypeRef::String, TypeRef::Primitive(Primitive::Int)],
                |this, args| {
                    this.set("name", args[0].clone())?;
                    this.set("age", args[1].clone())
                },
            )
            .with_native(|class, args| {
                let object = ObjectRef::allocate(class);
                object.set("name", args[0].clone())?;
                object.set("age", args[1].clone())?;
                Ok(object)
            }),
        )
        .build()
        .unwrap()
}

fn greeter() -> Arc<ClassDescriptor> {
    ClassBuilder::interface("app.Greeter")
        .method(MethodDescriptor::new("greet", vec![TypeRef::String], TypeRef::String))
        .method(MethodDescriptor::new("reset", Vec::new(), TypeRef::Void))
        .method(MethodDescriptor::new("count", Vec::new(), TypeRef::Primitive(Primitive::Int)))
        .build()
        .unwrap()
}

fn person_params() -> Vec<TypeRef> {
    vec![TypeRef::String, TypeRef::Primitive(Primitive::Int)]
}

#[tokio::test]
async fn test_constructor_invoker_memoization() {
    let runtime = ReflectionRuntime::default();
    let person = runtime.define(person()).unwrap();
    let params = person_params();

    let first = runtime
        .get_or_compile_constructor_invoker(&person, Some(&params))
        .unwrap();
    for _ in 0..10 {
        let again = runtime
            .get_or_compile_constructor_invoker(&person, Some(&params))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    let stats = runtime.cache_stats();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.hits, 10);
    assert_eq!(first.tier(), Tier::Native);
}

#[tokio::test]
async fn test_every_tier_builds_equivalent_instances() {
    let params = person_params();
    let args = [Value::from("Ann"), Value::Int(30)];

    let native = ReflectionRuntime::default();
    let handle = ReflectionRuntime::new(RuntimeConfig {
        invoker: infrastructure_common::InvokerConfig {
            native_tier: false,
            handle_tier: true,
        },
        ..RuntimeConfig::default()
    });
    let reflective = ReflectionRuntime::builder()
        .with_strategies(vec![Box::new(ReflectiveStrategy)])
        .build()
        .unwrap();

    let mut snapshots = Vec::new();
    for (runtime, tier) in [
        (&native, Tier::Native),
        (&handle, Tier::TypedHandle),
        (&reflective, Tier::Reflective),
    ] {
        let invoker = runtime
            .get_or_compile_constructor_invoker(&person(), Some(&params))
            .unwrap();
        assert_eq!(invoker.tier(), tier);

        let object = invoker.construct(&args).unwrap();
        assert_eq!(object.class().name(), "app.Person");
        snapshots.push(object.snapshot());
    }

    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[1], snapshots[2]);
    assert_eq!(snapshots[0]["app.Person.name"], Value::from("Ann"));
    assert_eq!(snapshots[0]["app.Person.age"], Value::Int(30));
}

#[tokio::test]
async fn test_int_field_round_trip() {
    let runtime = ReflectionRuntime::default();
    let person = person();
    let object = runtime
        .construct(&person, Some(&person_params()), &[Value::from("Ann"), Value::Int(30)])
        .unwrap();

    for name in ["age", "name"] {
        let invoker = runtime.get_or_compile_field_invoker(&person, name).unwrap();
        assert_eq!(invoker.name(), name);
    }

    let age = runtime.get_or_compile_field_invoker(&person, "age").unwrap();
    age.set(&object, Value::Int(42)).unwrap();
    assert_eq!(age.get(&object).unwrap(), Value::Int(42));
    assert_eq!(object.get("age"), Some(Value::Int(42)));

    assert!(matches!(
        age.set(&object, Value::from("42")),
        Err(ReflectError::ArgumentTypeMismatch { index: 1, .. })
    ));
}

#[tokio::test]
async fn test_argument_mismatch_is_reported() {
    let runtime = ReflectionRuntime::default();
    let invoker = runtime
        .get_or_compile_constructor_invoker(&person(), Some(&person_params()))
        .unwrap();

    match invoker.construct(&[Value::from("Ann")]) {
        Err(ReflectError::ArgumentTypeMismatch { index, .. }) => assert_eq!(index, 1),
        other => panic!("unexpected: {other:?}"),
    }
    match invoker.construct(&[Value::Int(1), Value::Int(30)]) {
        Err(ReflectError::ArgumentTypeMismatch { index, expected, .. }) => {
            assert_eq!(index, 0);
            assert_eq!(expected, "String");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_members_fail_resolution() {
    let runtime = ReflectionRuntime::default();
    let person = person();

    assert!(matches!(
        runtime.get_or_compile_constructor_invoker(&person, Some(&[TypeRef::Primitive(Primitive::Double)])),
        Err(ReflectError::MemberNotFound { .. })
    ));
    assert!(matches!(
        runtime.get_or_compile_field_invoker(&person, "email"),
        Err(ReflectError::MemberNotFound { .. })
    ));
    assert!(matches!(
        runtime.class("app.Missing"),
        Err(ReflectError::ClassNotFound { .. })
    ));
}

#[tokio::test]
async fn test_proxy_forwards_to_handler() {
    let runtime = ReflectionRuntime::default();
    let greeter = runtime.define(greeter()).unwrap();

    let mut handler = MockHandler::new();
    handler
        .expect_invoke()
        .withf(|_, method, args| method.to_string() == "greet" && args.len() == 1 && args[0] == Value::from("Sam"))
        .times(1)
        .returning(|_, _, args| Ok(Value::from(format!("hi {}", args[0].as_str().unwrap_or_default()))));

    let proxy = runtime
        .create_proxy(&ProxyConfig::new().implementing(&greeter), Arc::new(handler))
        .unwrap();

    assert_eq!(proxy.invoke("greet", &[Value::from("Sam")]).unwrap(), Value::from("hi Sam"));
    assert!(proxy.object().is_instance_of("app.Greeter"));
    assert!(proxy.proxy_class().name().starts_with("adsp.proxy.Greeter$Proxy$"));
}

#[tokio::test]
async fn test_void_method_ignores_handler_result() {
    let runtime = ReflectionRuntime::default();
    let greeter = greeter();
    let proxy = runtime
        .create_proxy(
            &ProxyConfig::new().implementing(&greeter),
            handler_fn(|_, _, _| Ok(Value::from("not void"))),
        )
        .unwrap();

    assert_eq!(proxy.invoke("reset", &[]).unwrap(), Value::Null);
}

#[tokio::test]
async fn test_handler_exception_is_transparent() {
    let runtime = ReflectionRuntime::default();
    let greeter = greeter();
    let proxy = runtime
        .create_proxy(
            &ProxyConfig::new().implementing(&greeter),
            handler_fn(|_, _, _| Err(Exception::illegal_state("x"))),
        )
        .unwrap();

    let error = proxy.invoke("greet", &[Value::from("Sam")]).unwrap_err();
    assert_eq!(error, Exception::illegal_state("x"));
    assert_eq!(error.to_string(), "IllegalStateException: x");
}

#[tokio::test]
async fn test_primitive_return_conversion() {
    let runtime = ReflectionRuntime::default();
    let greeter = greeter();
    let config = ProxyConfig::new().implementing(&greeter);

    let null = runtime
        .create_proxy(&config, handler_fn(|_, _, _| Ok(Value::Null)))
        .unwrap();
    assert!(null.invoke("count", &[]).unwrap_err().is("NullPointerException"));

    let wrong = runtime
        .create_proxy(&config, handler_fn(|_, _, _| Ok(Value::from("three"))))
        .unwrap();
    assert!(wrong.invoke("count", &[]).unwrap_err().is("ClassCastException"));
    assert!(wrong.invoke("greet", &[Value::from("Sam")]).is_ok());

    let right = runtime
        .create_proxy(&config, handler_fn(|_, _, _| Ok(Value::Int(3))))
        .unwrap();
    assert_eq!(right.invoke("count", &[]).unwrap(), Value::Int(3));

    assert_eq!(runtime.proxy_class_count(), 1);
}

#[tokio::test]
async fn test_unbound_proxy_object_raises_illegal_state() {
    let runtime = ReflectionRuntime::default();
    let greeter = greeter();
    let proxy_class = runtime
        .compile_proxy(&ProxyConfig::new().implementing(&greeter))
        .unwrap();

    let object = ObjectRef::allocate(proxy_class.class());
    assert!(object
        .invoke("greet", &[Value::from("Sam")])
        .unwrap_err()
        .is("IllegalStateException"));

    runtime
        .bind_handler(&object, handler_fn(|_, _, _| Ok(Value::from("late"))))
        .unwrap();
    assert_eq!(object.invoke("greet", &[Value::from("Sam")]).unwrap(), Value::from("late"));
    assert!(matches!(
        runtime.bind_handler(&object, handler_fn(|_, _, _| Ok(Value::Null))),
        Err(ReflectError::HandlerAlreadyBound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_access_compiles_once() {
    let runtime = Arc::new(ReflectionRuntime::default());
    let person = person();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let runtime = runtime.clone();
            let person = person.clone();
            tokio::task::spawn_blocking(move || {
                runtime
                    .get_or_compile_constructor_invoker(&person, Some(&person_params()))
                    .unwrap()
            })
        })
        .collect();

    let mut invokers = Vec::new();
    for task in tasks {
        invokers.push(task.await.unwrap());
    }

    assert_eq!(runtime.cache_stats().compilations, 1);
    assert!(invokers.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[tokio::test]
async fn test_tier_failure_falls_back() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let mut failing = MockStrategy::new();
    failing.expect_tier().return_const(Tier::TypedHandle);
    failing.expect_compile_constructor().times(1).returning(move |member| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(TierError::Inaccessible {
            member: member.display_name(),
        })
    });

    let runtime = ReflectionRuntime::builder()
        .with_strategies(vec![Box::new(failing), Box::new(ReflectiveStrategy)])
        .build()
        .unwrap();

    let invoker = runtime
        .get_or_compile_constructor_invoker(&person(), Some(&person_params()))
        .unwrap();
    assert_eq!(invoker.tier(), Tier::Reflective);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    let object = invoker.construct(&[Value::from("Ann"), Value::Int(30)]).unwrap();
    assert_eq!(object.get("name"), Some(Value::from("Ann")));
}

#[tokio::test]
async fn test_all_tiers_failing_reports_compilation_failure() {
    let mut failing = MockStrategy::new();
    failing.expect_tier().return_const(Tier::Native);
    failing
        .expect_compile_field()
        .returning(|member| Err(TierError::FinalField { member: member.display_name() }));

    let runtime = ReflectionRuntime::builder()
        .with_strategies(vec![Box::new(failing)])
        .build()
        .unwrap();

    assert!(matches!(
        runtime.get_or_compile_field_invoker(&person(), "age"),
        Err(ReflectError::CompilationFailure { .. })
    ));
    assert_eq!(runtime.cache_stats().entries, 0);
}

/// 父类构造器带副作用的服务类型
fn audited_service(constructions: Arc<AtomicUsize>) -> Arc<ClassDescriptor> {
    ClassBuilder::class("app.AuditedService")
        .field(FieldDescriptor::new("ready", TypeRef::Primitive(Primitive::Boolean)))
        .constructor(ConstructorDescriptor::new(Vec::new(), move |this, _| {
            constructions.fetch_add(1, Ordering::SeqCst);
            this.set("ready", true)
        }))
        .method(
            MethodDescriptor::new("status", Vec::new(), TypeRef::String)
                .with_body(|_, _| Ok(Value::from("direct"))),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_super_constructor_bypass() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let service = audited_service(constructions.clone());
    let runtime = ReflectionRuntime::default();

    let bypass = runtime
        .create_proxy(
            &ProxyConfig::new().extending(&service).call_super_constructor(false),
            handler_fn(|_, method, _| Ok(Value::from(format!("intercepted {method}")))),
        )
        .unwrap();
    assert_eq!(constructions.load(Ordering::SeqCst), 0);
    assert_eq!(bypass.object().get("ready"), Some(Value::Boolean(false)));
    assert_eq!(bypass.invoke("status", &[]).unwrap(), Value::from("intercepted status"));

    let constructed = runtime
        .create_proxy(
            &ProxyConfig::new().extending(&service),
            handler_fn(|_, _, _| Ok(Value::from("intercepted"))),
        )
        .unwrap();
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert_eq!(constructed.object().get("ready"), Some(Value::Boolean(true)));
}

#[tokio::test]
async fn test_bypass_without_allocation_tiers_runs_constructor() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let service = audited_service(constructions.clone());

    let mut config = RuntimeConfig::default();
    config.allocation.raw_allocation = false;
    config.allocation.handle_allocation = false;
    let runtime = ReflectionRuntime::new(config);

    let proxy = runtime
        .create_proxy(
            &ProxyConfig::new().extending(&service).call_super_constructor(false),
            handler_fn(|_, _, _| Ok(Value::Null)),
        )
        .unwrap();
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert_eq!(proxy.object().get("ready"), Some(Value::Boolean(true)));
}

#[tokio::test]
async fn test_generated_classes_are_dumped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = RuntimeConfig::default();
    config.proxy.namespace = "test.generated".to_string();
    config.proxy.dump_dir = Some(dir.path().to_path_buf());
    let runtime = ReflectionRuntime::builder().with_config(config).build()?;

    let greeter = greeter();
    let proxy_class = runtime.compile_proxy(&ProxyConfig::new().implementing(&greeter))?;
    assert_eq!(proxy_class.name(), "test.generated.Greeter$Proxy$0");

    let path = dir.path().join(format!("{}.json", proxy_class.name()));
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    assert_eq!(json["interfaces"][0], "app.Greeter");
    assert_eq!(json["methods"].as_array().map(Vec::len), Some(3));
    Ok(())
}
