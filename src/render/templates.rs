//! Built-in templates. Placeholders use `{{name}}` since nginx itself uses
//! single braces.

pub(super) const SERVICE_UNIT: &str = r#"[Unit]
Description={{service_description}}
After=network-online.target
Wants=network-online.target

[Service]
Type=simple
User={{service_user}}
Group={{service_user}}
WorkingDirectory={{working_dir}}
ExecStart={{exec_start}}
Restart=on-failure
RestartSec=5
EnvironmentFile=-{{environment_file}}

[Install]
WantedBy=multi-user.target
"#;

/// Port 80: answers ACME webroot challenges, redirects everything else.
pub(super) const PROXY_HTTP: &str = r#"server {
    listen 80;
    listen [::]:80;
    server_name {{server_names}};

    location ^~ /.well-known/acme-challenge/ {
        root {{webroot}};
        default_type "text/plain";
    }

    location / {
        return 301 https://$host$request_uri;
    }
}
"#;

pub(super) const PROXY_TLS_HEAD: &str = r#"
server {
    listen 443 ssl;
    listen [::]:443 ssl;
    server_name {{server_names}};

    ssl_certificate {{cert_path}};
    ssl_certificate_key {{cert_key_path}};
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_session_cache shared:SSL:10m;

    client_max_body_size 10m;

    location {{location_prefix}} {
        proxy_pass {{upstream}};
        proxy_set_header Host $host;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_set_header X-Forwarded-Host $host;
    }
"#;

/// Root served from disk when a static directory is configured.
pub(super) const PROXY_TLS_STATIC: &str = r#"
    location / {
        root {{static_root}};
        try_files $uri $uri/ =404;
    }
"#;

/// Root handed to the application when it is mounted below `/`.
pub(super) const PROXY_TLS_ROOT_UPSTREAM: &str = r#"
    location / {
        proxy_pass {{upstream}};
        proxy_set_header Host $host;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_set_header X-Forwarded-Host $host;
    }
"#;

pub(super) const PROXY_TLS_TAIL: &str = "}\n";
