//! Azure cloud environments and their management endpoints

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloudEnvironment {
    #[default]
    Public,
    UsGovernment,
    China,
    German,
}

impl CloudEnvironment {
    pub fn resource_manager_endpoint(&self) -> &'static str {
        match self {
            CloudEnvironment::Public => "https://management.azure.com/",
            CloudEnvironment::UsGovernment => "https://management.usgovcloudapi.net/",
            CloudEnvironment::China => "https://management.chinacloudapi.cn/",
            CloudEnvironment::German => "https://management.microsoftazure.de/",
        }
    }

    pub fn active_directory_endpoint(&self) -> &'static str {
        match self {
            CloudEnvironment::Public => "https://login.microsoftonline.com/",
            CloudEnvironment::UsGovernment => "https://login.microsoftonline.us/",
            CloudEnvironment::China => "https://login.chinacloudapi.cn/",
            CloudEnvironment::German => "https://login.microsoftonline.de/",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CloudEnvironment::Public => "public",
            CloudEnvironment::UsGovernment => "usgovernment",
            CloudEnvironment::China => "china",
            CloudEnvironment::German => "german",
        }
    }
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CloudEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "azurepubliccloud" => Ok(CloudEnvironment::Public),
            "usgovernment" | "azureusgovernment" | "azureusgovernmentcloud" => {
                Ok(CloudEnvironment::UsGovernment)
            }
            "china" | "azurechinacloud" => Ok(CloudEnvironment::China),
            "german" | "azuregermancloud" => Ok(CloudEnvironment::German),
            other => Err(format!(
                "unknown environment {:?}, expected one of public, usgovernment, china, german",
                other
            )),
        }
    }
}
