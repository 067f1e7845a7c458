use crate::handlers::ec2;
use wpvm_common::{CreateVmResponse, InstanceStatusResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        ec2::create_vm,
        ec2::check_status,
        ec2::stop_instance
    ),
    components(
        schemas(
            ec2::VmRequest,
            ec2::InstanceRequest,
            CreateVmResponse,
            InstanceStatusResponse
        )
    ),
    tags(
        (name = "EC2", description = "Provision, inspect and stop the WordPress instance")
    )
)]
pub struct ApiDoc;
