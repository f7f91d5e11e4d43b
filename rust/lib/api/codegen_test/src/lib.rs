//! Compiles the generator output for the sample projects and drives it
//! through the loopback transport.

include!(concat!(env!("OUT_DIR"), "/generated.rs"));

pub mod billing;

#[cfg(test)]
mod fixture;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use stubgen_runtime::error_code;
    use stubgen_runtime::prelude::*;
    use stubgen_runtime::rpc::{AuthArgs, Loopback};

    use crate::billing::Invoice;
    use crate::orders::*;

    #[derive(Default)]
    struct Shop {
        token: Option<AuthToken>,
        orders: Vec<Order>,
        invoices: Vec<Invoice>,
        cancelled: Vec<(i32, String)>,
        /// Longest accepted cancel reason, enforced through the DAV hook.
        reason_limit: Option<i64>,
    }

    impl ServerInterface for Shop {
        fn set_rpc_token(&mut self, token: Option<AuthToken>) {
            self.token = token;
        }

        fn init_dav_cache(&mut self, call: &str, dvc: &mut DavCache) {
            if let (Some(limit), "CancelOrder") = (self.reason_limit, call) {
                dvc.add_rule("reason", Dav::new(DavKind::Max, DavValue::Int(limit)));
            }
        }
    }

    impl OrdersService for Shop {
        fn get_order(&mut self, id: i32) -> Result<String, RpcError> {
            self.orders
                .iter()
                .find(|o| o.id == id)
                .map(|o| o.label.clone())
                .ok_or_else(|| RpcError::Failed(format!("no order {id}")))
        }

        fn place_order(&mut self, order: &mut Order, warnings: &mut Vec<String>) -> Result<i32, RpcError> {
            order.status = OrderStatus::KEY_OPEN.to_string();
            if order.lines.is_empty() {
                warnings.push("order has no lines".to_string());
            }
            self.orders.push(order.clone());
            Ok(self.orders.len() as i32)
        }

        fn cancel_order(&mut self, id: i32, reason: &str) -> Result<(), RpcError> {
            self.cancelled.push((id, reason.to_string()));
            Ok(())
        }

        fn raise_invoice(&mut self, invoice: &Invoice) -> Result<i64, RpcError> {
            let mut stored = invoice.clone();
            stored.id = self.invoices.len() as i64 + 1;
            self.invoices.push(stored);
            Ok(self.invoices.len() as i64)
        }

        fn void_invoice(&mut self, invoice: &Invoice) -> Result<(), RpcError> {
            self.invoices.retain(|i| i.id != invoice.id);
            Ok(())
        }
    }

    struct Session {
        role: &'static str,
    }

    impl ServerContext for Session {
        fn auth(&mut self, call: &str, requirement: &str, _args: &AuthArgs<'_>) -> Result<AuthToken, RpcError> {
            if requirement != self.role {
                return Err(RpcError::Unauthenticated(format!("{call} needs {requirement}")));
            }
            Ok(AuthToken(format!("{}:{call}", self.role)))
        }

        fn client_address(&self) -> String {
            "10.0.0.7".to_string()
        }
    }

    type Client = OrdersClientMarshaler<Loopback<OrdersServerMarshaler<Shop>, Session>>;

    fn client(shop: Shop, role: &'static str) -> Client {
        OrdersClientMarshaler::new(Loopback::new(OrdersServerMarshaler::new(shop), Session { role }))
    }

    fn shop_of(client: Client) -> Shop {
        client.into_inner().into_inner().0.into_inner()
    }

    fn remote_code(err: RpcError) -> i32 {
        match err {
            RpcError::Remote { code, .. } => code,
            other => panic!("unexpected {other}"),
        }
    }

    fn order() -> Order {
        let mut order = Order::new();
        order.id = 4;
        order.label = "standing desk".to_string();
        order.status = OrderStatus::KEY_SHIPPED.to_string();
        order.placed = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        order.ship_to.street = "Main Street 1".to_string();
        order.ship_to.city = "Lyon".to_string();
        order.ship_to.country = "FR".to_string();
        let mut line = OrderLine::new();
        line.sku = "DSK-0001".to_string();
        line.qty = 1;
        line.price = 499.0;
        order.lines.push(line);
        order
    }

    #[test]
    fn orders_round_trip() {
        let mut client = client(Shop::default(), "customer");

        let mut placed = order();
        let mut warnings = vec!["stale".to_string()];
        assert_eq!(client.place_order(&mut placed, &mut warnings).unwrap(), 1);
        assert_eq!(placed.status, "O");
        assert!(warnings.is_empty());
        assert_eq!(client.get_order(4).unwrap(), "standing desk");

        let err = client.get_order(5).unwrap_err();
        assert_eq!(remote_code(err), error_code::FAILED);

        let shop = shop_of(client);
        assert_eq!(shop.orders, vec![placed]);
        assert_eq!(shop.token, None);
    }

    #[test]
    fn record_rules_guard_inputs() {
        let mut client = client(Shop::default(), "customer");
        let mut bad = order();
        bad.lines[0].sku = "desk".to_string();
        let err = client.place_order(&mut bad, &mut Vec::new()).unwrap_err();
        assert_eq!(remote_code(err), error_code::VALIDATION_FAILED);

        let mut bad = order();
        bad.ship_to.country = "XX".to_string();
        assert!(client.place_order(&mut bad, &mut Vec::new()).is_err());
        assert!(shop_of(client).orders.is_empty());
    }

    #[test]
    fn member_overrides_apply_per_call() {
        let mut early = order();
        early.placed = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let mut unnamed = order();
        unnamed.label.clear();

        // the record's own rules accept both
        assert!(early.validate().is_ok());
        assert!(unnamed.validate().is_ok());

        let mut client = client(Shop::default(), "customer");
        let err = client.place_order(&mut early, &mut Vec::new()).unwrap_err();
        assert_eq!(remote_code(err), error_code::VALIDATION_FAILED);
        let err = client.place_order(&mut unnamed, &mut Vec::new()).unwrap_err();
        assert_eq!(remote_code(err), error_code::VALIDATION_FAILED);
    }

    #[test]
    fn dav_hook_adds_rules() {
        let mut client = client(Shop::default(), "admin");
        client.cancel_order(4, "changed my mind about it").unwrap();
        assert!(client.cancel_order(4, "").is_err());

        let limited = Shop {
            reason_limit: Some(10),
            ..Shop::default()
        };
        let mut client = self::client(limited, "admin");
        client.cancel_order(4, "too late").unwrap();
        let err = client.cancel_order(5, "changed my mind about it").unwrap_err();
        assert_eq!(remote_code(err), error_code::VALIDATION_FAILED);

        let shop = shop_of(client);
        assert_eq!(shop.cancelled, vec![(4, "too late".to_string())]);
        assert_eq!(shop.token, Some(AuthToken("admin:CancelOrder".to_string())));
    }

    #[test]
    fn insert_skips_generated_columns() {
        let mut client = client(Shop::default(), "admin");
        let fresh = Invoice { id: 0, total: 120.0 };
        assert!(fresh.validate().is_err());
        assert_eq!(client.raise_invoice(&fresh).unwrap(), 1);

        let negative = Invoice { id: 0, total: -1.0 };
        assert!(client.raise_invoice(&negative).is_err());
        let huge = Invoice { id: 0, total: 20000.0 };
        let err = client.raise_invoice(&huge).unwrap_err();
        assert_eq!(remote_code(err), error_code::VALIDATION_FAILED);
        assert_eq!(shop_of(client).invoices, vec![Invoice { id: 1, total: 120.0 }]);
    }

    #[test]
    fn key_checks_only_the_key() {
        let mut client = client(Shop::default(), "admin");
        client.raise_invoice(&Invoice { id: 0, total: 80.0 }).unwrap();

        assert!(client.void_invoice(&Invoice { id: 0, total: 80.0 }).is_err());
        client.void_invoice(&Invoice { id: 1, total: -5.0 }).unwrap();
        assert!(shop_of(client).invoices.is_empty());
    }

    #[test]
    fn failed_auth_reaches_the_client() {
        let mut client = client(Shop::default(), "customer");
        let err = client.cancel_order(4, "late").unwrap_err();
        assert_eq!(remote_code(err), error_code::UNAUTHENTICATED);
        assert!(shop_of(client).cancelled.is_empty());
    }

    #[test]
    fn direct_client_skips_streams_and_rules() {
        let mut direct = OrdersDirectClient::new(Shop::default());
        let mut early = order();
        early.placed = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        assert_eq!(direct.place_order(&mut early, &mut Vec::new()).unwrap(), 1);
        assert_eq!(direct.get_order(4).unwrap(), "standing desk");
        assert_eq!(direct.into_inner().orders.len(), 1);
    }

    #[test]
    fn couplet_lookup() {
        assert_eq!(OrderStatus::get_value(OrderStatus::KEY_CANCELLED), OrderStatus::VALUE_CANCELLED);
        assert_eq!(OrderStatus::KEYS, ["O", "S", "C"]);
        assert_eq!(OrderStatus::get_value("Z"), "");
    }

    mod keywords {
        use stubgen_runtime::prelude::*;
        use stubgen_runtime::rpc::{AuthArgs, Loopback};

        use crate::keywords::*;

        #[derive(Default)]
        struct Mover {
            moves: usize,
        }

        impl ServerInterface for Mover {
            fn set_rpc_token(&mut self, _token: Option<AuthToken>) {}
        }

        impl KeywordsServer for Mover {
            fn r#move(&mut self, r#ref: i32, r#type: &str, slot: &mut Slot) -> Result<bool, RpcError> {
                self.moves += 1;
                slot.r#ref += r#ref;
                slot.r#match.push(r#type.to_string());
                slot.self_ = !slot.self_;
                Ok(slot.self_)
            }
        }

        struct Anyone;

        impl ServerContext for Anyone {
            fn auth(&mut self, call: &str, _requirement: &str, _args: &AuthArgs<'_>) -> Result<AuthToken, RpcError> {
                Ok(AuthToken(call.to_string()))
            }
        }

        #[test]
        fn keyword_names_compile_and_run() {
            let server = KeywordsServerMarshaler::new(Mover::default());
            let mut client = KeywordsClientMarshaler::new(Loopback::new(server, Anyone));

            let mut slot = Slot::new();
            slot.r#type = "crate".to_string();
            slot.r#ref = 1;
            assert!(client.r#move(2, "left", &mut slot).unwrap());
            assert_eq!((slot.r#ref, slot.r#match.clone()), (3, vec!["left".to_string()]));

            // `ref:min` lifts the record's own floor of 0 to 1 for this call
            slot.r#ref = 0;
            assert!(slot.validate().is_ok());
            assert!(client.r#move(2, "left", &mut slot).is_err());

            slot.r#ref = 1;
            assert!(client.r#move(2, "up", &mut slot).is_err());
            slot.r#type.clear();
            assert!(client.r#move(2, "right", &mut slot).is_err());

            let (server, _) = client.into_inner().into_inner();
            assert_eq!(server.into_inner().moves, 1);
        }
    }

    mod regeneration {
        use std::path::Path;

        use pretty_assertions::assert_eq;
        use stubgen_codegen_lib::{GenInfo, Options, Orchestrator};
        use stubgen_ir::Project;

        use crate::fixture::{FIXTURES, TIMESTAMP};

        #[test]
        fn compiled_output_is_current() {
            let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
            let out = Path::new(env!("OUT_DIR"));
            for f in FIXTURES {
                let json = std::fs::read_to_string(manifest.join(f.schema)).unwrap();
                let project = Project::from_json(&json).unwrap();
                let options = match f.options {
                    Some(path) => Options::load(&manifest.join(path)).unwrap(),
                    None => Options::default(),
                };
                let code = Orchestrator::new(&project, options)
                    .with_info(GenInfo::fixed(TIMESTAMP))
                    .generate()
                    .unwrap();

                let on_disk = std::fs::read_dir(out.join(f.module)).unwrap().count();
                assert_eq!(on_disk, code.files.len(), "{}", f.module);
                for file in &code.files {
                    let compiled = std::fs::read_to_string(out.join(f.module).join(&file.path)).unwrap();
                    assert_eq!(compiled, file.content, "{}/{}", f.module, file.path);
                }
            }
        }
    }
}
