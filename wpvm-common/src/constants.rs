// Provider-side constants for the single instance class this service manages.

pub const TARGET_REGION: &str = "eu-west-1";
pub const WORDPRESS_AMI: &str = "ami-0ec852340933f4f48";
pub const INSTANCE_TYPE: &str = "t2.micro";

pub const SECURITY_GROUP_NAME: &str = "bitnami-wordpress-sg";
pub const SECURITY_GROUP_DESCRIPTION: &str = "Opens port 80, 443 and 22";

/// Ports opened to the world on every security group we create (http, https, ssh).
pub const OPEN_TCP_PORTS: [u16; 3] = [80, 443, 22];
pub const ANYWHERE_CIDR: &str = "0.0.0.0/0";

// Provider error codes
pub const DRY_RUN_OPERATION: &str = "DryRunOperation";
pub const UNAUTHORIZED_OPERATION: &str = "UnauthorizedOperation";
pub const AUTH_FAILURE: &str = "AuthFailure";
pub const INSTANCE_NOT_FOUND: &str = "InvalidInstanceID.NotFound";
pub const INSTANCE_ID_MALFORMED: &str = "InvalidInstanceID.Malformed";

// User-facing messages
pub const MSG_OPERATION_DENIED: &str = "You don't have permissions to perform this operation";
pub const MSG_NO_EC2_ACCESS: &str = "The given credentials does not have permissions to access EC2. Please,grant full access to EC2 to the given credentials";
pub const MSG_STATUS_ERROR: &str = "There has been an error getting the status of the VM";
pub const MSG_INSTANCE_ACCESS: &str = "Error accessing to instance data";
pub const MSG_MISSING_CREDENTIALS: &str = "Must provide AWS Credentials";
