//! A hand-written record and call pair, shaped like generated code, driven
//! through the loopback transport.

use pretty_assertions::assert_eq;
use stubgen_runtime::error_code;
use stubgen_runtime::prelude::*;
use stubgen_runtime::rpc::{AuthArgs, Loopback};

#[derive(Clone, PartialEq)]
struct Point {
    x: i32,
    label: String,
}

impl Point {
    fn new() -> Self {
        Self {
            x: 0,
            label: String::new(),
        }
    }

    fn clear(&mut self) {
        self.x = 0;
        self.label = String::new();
    }
}

impl Serializable for Point {
    fn serialize(&self, w: &mut dyn Writer, name: Option<&str>) -> Result<(), StreamError> {
        w.write_start(name.unwrap_or("Point"))?;
        w.write_i32("x", self.x)?;
        w.write_string("label", &self.label)?;
        w.write_end(name.unwrap_or("Point"))
    }

    fn deserialize(&mut self, r: &mut dyn Reader, name: Option<&str>) -> Result<(), StreamError> {
        r.read_start(name.unwrap_or("Point"))?;
        self.x = r.read_i32("x")?;
        self.label = r.read_string("label")?;
        r.read_end(name.unwrap_or("Point"))
    }
}

impl Validate for Point {
    fn cache_davs(dvc: &mut DavCache) {
        dvc.add_rule("x", Dav::new(DavKind::Min, DavValue::Int(0)));
        dvc.add_rule("label", Dav::new(DavKind::NotNull, DavValue::None));
    }

    fn validate_davs(&self, dvc: &DavCache) -> Result<(), DavError> {
        dvc.validate("x", &self.x)?;
        dvc.validate("label", &self.label)?;
        Ok(())
    }
}

trait ShapesServer: ServerInterface {
    fn shift(&mut self, by: i32, p: &mut Point) -> Result<i32, RpcError>;
}

#[derive(Default)]
struct Shapes {
    token: Option<AuthToken>,
    calls: usize,
}

impl ServerInterface for Shapes {
    fn set_rpc_token(&mut self, token: Option<AuthToken>) {
        self.token = token;
    }
}

impl ShapesServer for Shapes {
    fn shift(&mut self, by: i32, p: &mut Point) -> Result<i32, RpcError> {
        self.calls += 1;
        p.x += by;
        p.label = format!("{}+{by}", p.label);
        Ok(p.x)
    }
}

struct ShapesServerMarshaler<S: ShapesServer> {
    server_impl: S,
}

impl<S: ShapesServer> ShapesServerMarshaler<S> {
    fn handle_shift(&mut self, _input: &Stream, _ctx: &mut dyn ServerContext) -> Result<Stream, RpcError> {
        let mut _r = _input.reader();
        _r.read_start("Shift_IN")?;
        let by = _r.read_i32("by")?;
        let mut p = Point::new();
        p.deserialize(&mut _r, Some("p"))?;
        _r.read_end("Shift_IN")?;
        let _tok = _ctx.auth("Shift", "editor", &[("by", &by as &dyn fmt::Debug)])?;
        self.server_impl.set_rpc_token(Some(_tok));
        let mut _dvc = DavCache::new();
        _dvc.add_rule("by", Dav::new(DavKind::Max, DavValue::Int(100)));
        _dvc.validate("by", &by)?;
        _dvc.validate_object("p", &p)?;
        let _ret = self.server_impl.shift(by, &mut p)?;
        let mut _o = Stream::new();
        {
            let mut _w = _o.writer();
            _w.write_start("Shift_OUT")?;
            _w.write_i32("returns", _ret)?;
            p.serialize(&mut _w, Some("p"))?;
            _w.write_end("Shift_OUT")?;
        }
        Ok(_o)
    }
}

impl<S: ShapesServer> ServerMarshaler for ShapesServerMarshaler<S> {
    fn serve(
        &mut self,
        remote_sig: &str,
        input: &Stream,
        ctx: &mut dyn ServerContext,
    ) -> Result<Reply, RpcError> {
        let result = match remote_sig {
            "SH1" => self.handle_shift(input, ctx),
            _ => Err(RpcError::UnknownSignature(remote_sig.to_string())),
        };
        match result {
            Ok(output) => Ok(Reply::ok(output)),
            Err(err) if err.is_terminal() => Err(err),
            Err(err) => Ok(Reply::error(&err)),
        }
    }
}

struct Editors {
    allow: bool,
}

impl ServerContext for Editors {
    fn auth(&mut self, call: &str, requirement: &str, args: &AuthArgs<'_>) -> Result<AuthToken, RpcError> {
        if !self.allow {
            return Err(RpcError::Unauthenticated(format!("{call} needs {requirement}")));
        }
        let rendered: Vec<String> = args.iter().map(|(tag, v)| format!("{tag}={v:?}")).collect();
        Ok(AuthToken(rendered.join(",")))
    }
}

fn shift(transport: &mut impl ClientTransport, by: i32, p: &mut Point) -> Result<i32, RpcError> {
    let mut _i = Stream::new();
    {
        let mut _w = _i.writer();
        _w.write_start("Shift_IN")?;
        _w.write_i32("by", by)?;
        p.serialize(&mut _w, Some("p"))?;
        _w.write_end("Shift_IN")?;
    }
    transport.send("SH1", _i)?;
    let _o = transport.receive("SH1")?;
    let mut _r = _o.reader();
    _r.read_start("Shift_OUT")?;
    let _ret = _r.read_i32("returns")?;
    p.clear();
    p.deserialize(&mut _r, Some("p"))?;
    _r.read_end("Shift_OUT")?;
    Ok(_ret)
}

fn loopback(allow: bool) -> Loopback<ShapesServerMarshaler<Shapes>, Editors> {
    let marshaler = ShapesServerMarshaler {
        server_impl: Shapes::default(),
    };
    Loopback::new(marshaler, Editors { allow })
}

#[test]
fn call_round_trip_binds_outputs() {
    let mut transport = loopback(true);
    let mut p = Point {
        x: 2,
        label: "a".into(),
    };

    assert_eq!(shift(&mut transport, 3, &mut p).unwrap(), 5);
    assert!(p == Point { x: 5, label: "a+3".into() });

    let server = &transport.marshaler().server_impl;
    assert_eq!(server.calls, 1);
    assert_eq!(server.token, Some(AuthToken("by=3".into())));
}

#[test]
fn rejected_input_never_reaches_the_implementation() {
    let mut transport = loopback(true);

    let mut p = Point::new();
    p.x = -1;
    let err = shift(&mut transport, 1, &mut p).unwrap_err();
    match err {
        RpcError::Remote { code, message } => {
            assert_eq!(code, error_code::VALIDATION_FAILED);
            assert_eq!(message, "p.x: value -1 violates min 0");
        }
        other => panic!("unexpected {other:?}"),
    }

    let err = shift(&mut transport, 101, &mut Point::new()).unwrap_err();
    assert_eq!(err.error_code(), error_code::VALIDATION_FAILED);
    assert_eq!(transport.marshaler().server_impl.calls, 0);
}

#[test]
fn failed_auth_is_reported() {
    let mut transport = loopback(false);
    let err = shift(&mut transport, 1, &mut Point::new()).unwrap_err();
    assert_eq!(err.error_code(), error_code::UNAUTHENTICATED);
    assert_eq!(transport.marshaler().server_impl.calls, 0);
}

#[test]
fn unknown_signature_reply() {
    let mut marshaler = ShapesServerMarshaler {
        server_impl: Shapes::default(),
    };
    let reply = marshaler
        .serve("ZZ9", &Stream::new(), &mut Editors { allow: true })
        .unwrap();
    assert_eq!(reply.code, 404);
    assert_eq!(reply.message.as_deref(), Some("remote signature not known [ZZ9]"));
    assert!(reply.stream.is_empty());
}

#[test]
fn standalone_validation() {
    let ok = Point {
        x: 4,
        label: "p".into(),
    };
    assert!(ok.validate().is_ok());

    let bad = Point {
        x: -4,
        label: "p".into(),
    };
    let err = bad.validate().unwrap_err();
    assert_eq!(err.to_string(), "x: value -4 violates min 0");
}
