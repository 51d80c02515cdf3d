use std::sync::Arc;

use anyhow::Result;
use log::error;

use crate::expect_json;
use crate::server::authz::store::PolicyStore;
use crate::server::db::{Database, RoleRecord};
use crate::server::response::{self, Response};
use crate::types::request::Query;
use crate::types::user::{PatchRoleRequest, PolicyRule, Role};

use super::{policy_error_response, ResourceHandler};

/// Role CRUD. Mutations go through the policy store so compound updates
/// (create with rules, rename, delete) stay atomic; reads hit the database
/// directly.
pub struct RolesHandler {
    db: Arc<Database>,
    store: PolicyStore,
}

impl RolesHandler {
    pub fn new(db: Arc<Database>, store: PolicyStore) -> Self {
        Self { db, store }
    }

    fn convert_record(record: RoleRecord, rules: Vec<PolicyRule>) -> Role {
        Role {
            name: record.name,
            rules,
            create_time: record.create_time,
            update_time: record.update_time,
        }
    }

    fn validate_rules(rules: &[PolicyRule]) -> Option<Response> {
        for rule in rules {
            if rule.path.is_empty() {
                return Some(Response::bad_request("rule path is required"));
            }
            if rule.method.is_empty() {
                return Some(Response::bad_request("rule method is required"));
            }
        }
        None
    }
}

impl ResourceHandler for RolesHandler {
    fn post(&self, body: String) -> Response {
        let role: Role = expect_json!(body);
        if role.name.is_empty() {
            return Response::bad_request("role name is required");
        }
        if let Some(resp) = Self::validate_rules(&role.rules) {
            return resp;
        }

        match self.store.create_role(&role.name, &role.rules) {
            Ok(()) => Response::ok(),
            Err(err) => policy_error_response("Create role", err),
        }
    }

    fn put(&self, id: String, body: Option<String>) -> Response {
        let body = match body {
            Some(body) => body,
            None => return Response::bad_request("request body is required"),
        };

        let patch: PatchRoleRequest = expect_json!(body);
        if patch.name.is_none() && patch.rules.is_none() {
            return Response::bad_request("at least one of name, rules is required");
        }
        if let Some(ref rules) = patch.rules {
            if let Some(resp) = Self::validate_rules(rules) {
                return resp;
            }
        }

        let mut name = id;
        if let Some(new) = patch.name {
            if new.is_empty() {
                return Response::bad_request("role name cannot be empty");
            }
            if let Err(err) = self.store.rename_role(&name, &new) {
                return policy_error_response("Rename role", err);
            }
            name = new;
        }

        if let Some(rules) = patch.rules {
            if let Err(err) = self.store.replace_permissions(&name, &rules) {
                return policy_error_response("Replace role rules", err);
            }
        }

        Response::ok()
    }

    fn list(&self, _query: Query) -> Response {
        let result: Result<Vec<Role>> = self.db.with_transaction(|tx| {
            let records = tx.list_roles()?;
            let mut roles = Vec::with_capacity(records.len());
            for record in records {
                let rules = tx.list_role_policies(&record.name)?;
                roles.push(Self::convert_record(record, rules));
            }
            Ok(roles)
        });

        match result {
            Ok(roles) => Response::json(roles),
            Err(err) => {
                error!("List roles database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    fn get(&self, id: String) -> Response {
        let name = id;
        let result: Result<Option<Role>> = self.db.with_transaction(|tx| {
            if !tx.is_role_exists(&name)? {
                return Ok(None);
            }
            let record = tx.get_role(&name)?;
            let rules = tx.list_role_policies(&name)?;
            Ok(Some(Self::convert_record(record, rules)))
        });

        match result {
            Ok(Some(role)) => Response::json(role),
            Ok(None) => Response::not_found(),
            Err(err) => {
                error!("Get role database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    fn delete(&self, id: String) -> Response {
        match self.store.delete_role(&id) {
            Ok(()) => Response::ok(),
            Err(err) => policy_error_response("Delete role", err),
        }
    }
}
