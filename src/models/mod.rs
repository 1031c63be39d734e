pub mod authz;
pub mod rbac;
pub mod work_item;
