// Demo controller mounted under /web

use crate::service::QueryService;
use tracing::info;
use trellis::{Autowired, Describe, Error, Invocation, Param, Result, register_component};

#[derive(Default)]
pub struct WebController {
    service: Autowired<dyn QueryService>,
}

impl WebController {
    /// `/web/query?name=...`: writes the service's answer to the response
    fn query(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let name = inv.text(2).unwrap_or_default().to_string();
        let result = self.service.require()?.get(&name);
        inv.response(1)
            .ok_or(Error::MissingArgument(1))?
            .write(&result);
        Ok(())
    }

    /// `/web/add?a=..&b=..`
    fn add(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let a = inv.require_integer(2)?;
        let b = inv.require_integer(3)?;
        let sum = a.checked_add(b).ok_or_else(|| Error::handler("integer overflow"))?;
        inv.response(1)
            .ok_or(Error::MissingArgument(1))?
            .write(&format!("{}+{}={}", a, b, sum));
        Ok(())
    }

    /// `/web/remove?id=..`: accepted, nothing written
    fn remove(&self, inv: &mut Invocation<'_>) -> Result<()> {
        if let Some(id) = inv.integer(2) {
            info!(id, "Remove requested");
        }
        Ok(())
    }
}

register_component!(WebController, || {
    Describe::<WebController>::new()
        .controller("")
        .request_mapping("web")
        .constructor(WebController::default)
        .autowired::<dyn QueryService>("service", "", |c| &c.service)
        .route(
            "query",
            "/query",
            vec![Param::request(), Param::response(), Param::text("name")],
            WebController::query,
        )
        .route(
            "add",
            "/add",
            vec![
                Param::request(),
                Param::response(),
                Param::integer("a"),
                Param::integer("b"),
            ],
            WebController::add,
        )
        .route(
            "remove",
            "/remove",
            vec![Param::request(), Param::response(), Param::integer("id")],
            WebController::remove,
        )
        .build()
});
