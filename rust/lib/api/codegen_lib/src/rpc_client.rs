//! Client artifacts: the client interface, the stream marshaler bound to a
//! transport, and the in-process direct client.

use crate::code_writer::CodeWriter;
use crate::context::{GenContext, Slot};
use crate::error::Result;
use crate::ident::IdentClass;
use crate::rpc::{calls, CallModel, RETURN_TAG, RETURN_VAR, RPC_R, RPC_W};
use crate::{Codegen, GeneratedCode};

pub struct ClientGenerator;

impl ClientGenerator {
    fn emit_interface(
        &self,
        ctx: &GenContext<'_>,
        name: &str,
        models: &[CallModel<'_>],
    ) -> Result<String> {
        let mut w = CodeWriter::new();
        w.doc(&format!("Client side of the `{}` calls.", ctx.project.name))?;
        w.block(&format!("pub trait {name}"), |w| {
            for (i, m) in models.iter().enumerate() {
                if i > 0 {
                    w.blank_line()?;
                }
                if let Some(descr) = &m.call.descr {
                    w.doc(descr)?;
                }
                writeln!(w, "{};", m.signature(ctx)?)?;
            }
            Ok(())
        })?;
        Ok(w.finish())
    }

    fn emit_method(&self, ctx: &GenContext<'_>, w: &mut CodeWriter, m: &CallModel<'_>) -> Result<()> {
        let sig = &m.call.signature;
        w.block(&m.signature(ctx)?, |w| {
            if m.has_input() {
                let tag = m.in_tag();
                w.line("let mut _i = Stream::new();")?;
                w.block("", |w| {
                    w.line("let mut _w = _i.writer();")?;
                    writeln!(w, "_w.write_start(\"{tag}\")?;")?;
                    for p in m.inputs() {
                        let slot = if p.io.is_output() {
                            Slot::RefParam(&p.ident)
                        } else {
                            Slot::Param(&p.ident)
                        };
                        w.line(&ctx.write_stmt(RPC_W, p.tag, slot, p.wire, &p.context)?)?;
                    }
                    writeln!(w, "_w.write_end(\"{tag}\")?;")?;
                    Ok(())
                })?;
            } else {
                w.line("let _i = Stream::new();")?;
            }
            writeln!(w, "self.transport.send(\"{sig}\", _i)?;")?;

            if !m.has_output() {
                writeln!(w, "self.transport.receive(\"{sig}\")?;")?;
                w.line("Ok(())")?;
                return Ok(());
            }

            let tag = m.out_tag();
            writeln!(w, "let _o = self.transport.receive(\"{sig}\")?;")?;
            w.line("let mut _r = _o.reader();")?;
            writeln!(w, "_r.read_start(\"{tag}\")?;")?;
            if let Some(ret) = &m.returns {
                for stmt in ctx.read_stmts(RPC_R, RETURN_TAG, Slot::Local(RETURN_VAR), ret.wire, &ret.context)? {
                    w.line(&stmt)?;
                }
            }
            for p in m.outputs() {
                for stmt in ctx.read_stmts(RPC_R, p.tag, Slot::RefParam(&p.ident), p.wire, &p.context)? {
                    w.line(&stmt)?;
                }
            }
            writeln!(w, "_r.read_end(\"{tag}\")?;")?;
            if m.returns.is_some() {
                writeln!(w, "Ok({RETURN_VAR})")?;
            } else {
                w.line("Ok(())")?;
            }
            Ok(())
        })
    }

    fn emit_marshaler(
        &self,
        ctx: &GenContext<'_>,
        name: &str,
        interface: &str,
        models: &[CallModel<'_>],
    ) -> Result<String> {
        let mut w = CodeWriter::new();
        w.doc(&format!(
            "[`{interface}`] over a [`ClientTransport`]: each call writes a request stream and reads the reply."
        ))?;
        w.block(&format!("pub struct {name}<T: ClientTransport>"), |w| {
            w.line("transport: T,")?;
            Ok(())
        })?;
        w.blank_line()?;

        w.block(&format!("impl<T: ClientTransport> {name}<T>"), |w| {
            w.block("pub fn new(transport: T) -> Self", |w| {
                w.line("Self { transport }")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("pub fn transport(&mut self) -> &mut T", |w| {
                w.line("&mut self.transport")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("pub fn into_inner(self) -> T", |w| {
                w.line("self.transport")?;
                Ok(())
            })
        })?;
        w.blank_line()?;

        w.block(&format!("impl<T: ClientTransport> {interface} for {name}<T>"), |w| {
            for (i, m) in models.iter().enumerate() {
                if i > 0 {
                    w.blank_line()?;
                }
                self.emit_method(ctx, w, m)?;
            }
            Ok(())
        })?;
        Ok(w.finish())
    }

    fn emit_direct(
        &self,
        ctx: &GenContext<'_>,
        name: &str,
        interface: &str,
        server: &str,
        models: &[CallModel<'_>],
    ) -> Result<String> {
        let mut w = CodeWriter::new();
        w.doc(&format!(
            "[`{interface}`] calling a [`{server}`] implementation in process, without streams."
        ))?;
        w.block(&format!("pub struct {name}<S: {server}>"), |w| {
            w.line("server_impl: S,")?;
            Ok(())
        })?;
        w.blank_line()?;

        w.block(&format!("impl<S: {server}> {name}<S>"), |w| {
            w.block("pub fn new(server_impl: S) -> Self", |w| {
                w.line("Self { server_impl }")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("pub fn server_impl(&mut self) -> &mut S", |w| {
                w.line("&mut self.server_impl")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("pub fn into_inner(self) -> S", |w| {
                w.line("self.server_impl")?;
                Ok(())
            })
        })?;
        w.blank_line()?;

        w.block(&format!("impl<S: {server}> {interface} for {name}<S>"), |w| {
            for (i, m) in models.iter().enumerate() {
                if i > 0 {
                    w.blank_line()?;
                }
                let args: Vec<&str> = m.params.iter().map(|p| p.ident.as_str()).collect();
                w.block(&m.signature(ctx)?, |w| {
                    writeln!(w, "self.server_impl.{}({})", m.method, args.join(", "))?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        Ok(w.finish())
    }
}

impl Codegen for ClientGenerator {
    fn generate(&self, ctx: &GenContext<'_>) -> Result<GeneratedCode> {
        let project = &ctx.project.name;
        let models = calls(ctx)?;

        let interface = ctx.ident(IdentClass::ClientInterface, project);
        let marshaler = ctx.ident(IdentClass::ClientMarshaler, project);
        let direct = ctx.ident(IdentClass::DirectClient, project);
        let server = ctx.ident(IdentClass::ServerInterface, project);

        let mut code = GeneratedCode::default();
        code.files
            .push(ctx.unit(&interface, &self.emit_interface(ctx, &interface, &models)?));
        code.files.push(ctx.unit(
            &marshaler,
            &self.emit_marshaler(ctx, &marshaler, &interface, &models)?,
        ));
        code.files.push(ctx.unit(
            &direct,
            &self.emit_direct(ctx, &direct, &interface, &server, &models)?,
        ));

        tracing::debug!("client artifacts for {} ({} calls)", project, models.len());
        Ok(code)
    }

    fn name(&self) -> &str {
        "rpc-client"
    }
}
